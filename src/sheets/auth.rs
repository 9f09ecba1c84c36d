use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::config::ServiceAccount;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Claims of the service-account assertion (RFC 7523).
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Signs RS256 assertions and trades them for OAuth access tokens.
#[derive(Clone)]
pub struct ServiceAccountKeys {
    encoding: EncodingKey,
    issuer: String,
    token_uri: String,
    scope: String,
    ttl: Duration,
}

impl ServiceAccountKeys {
    pub fn from_service_account(sa: &ServiceAccount) -> anyhow::Result<Self> {
        let encoding = EncodingKey::from_rsa_pem(sa.private_key.as_bytes())
            .context("parse service account private key")?;
        Ok(Self {
            encoding,
            issuer: sa.client_email.clone(),
            token_uri: sa.token_uri.clone(),
            scope: SHEETS_SCOPE.to_string(),
            ttl: Duration::from_secs(60 * 60),
        })
    }

    pub fn sign_assertion(&self) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = AssertionClaims {
            iss: self.issuer.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding)?;
        debug!(iss = %self.issuer, "service account assertion signed");
        Ok(token)
    }

    pub async fn access_token(&self, client: &reqwest::Client) -> anyhow::Result<String> {
        let assertion = self.sign_assertion()?;
        let resp = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("oauth token request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("oauth token request failed ({status}): {err}");
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("decode oauth token response")?;
        debug!(expires_in = ?token.expires_in, "oauth access token issued");
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;
    use httpmock::prelude::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::json;

    const PRIVATE_KEY: &str = include_str!("testdata/service_account_key.pem");
    const PUBLIC_KEY: &str = include_str!("testdata/service_account_pub.pem");

    fn account(token_uri: &str) -> ServiceAccount {
        ServiceAccount {
            client_email: "logger@proj.iam.gserviceaccount.com".into(),
            private_key: PRIVATE_KEY.into(),
            token_uri: token_uri.into(),
        }
    }

    #[test]
    fn assertion_carries_issuer_scope_and_audience() {
        let keys = ServiceAccountKeys::from_service_account(&account("https://oauth2.example/token"))
            .expect("key parses");
        let token = keys.sign_assertion().expect("sign");

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.example/token"]);
        validation.set_issuer(&["logger@proj.iam.gserviceaccount.com"]);
        let data = decode::<AssertionClaims>(
            &token,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .expect("verify");
        assert_eq!(data.claims.scope, SHEETS_SCOPE);
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn malformed_private_key_is_rejected() {
        let mut sa = account("https://oauth2.example/token");
        sa.private_key = "not a key".into();
        assert!(ServiceAccountKeys::from_service_account(&sa).is_err());
    }

    #[tokio::test]
    async fn exchanges_assertion_for_access_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .x_www_form_urlencoded_tuple("grant_type", JWT_BEARER_GRANT);
                then.status(200)
                    .json_body(json!({"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"}));
            })
            .await;

        let keys = ServiceAccountKeys::from_service_account(&account(&server.url("/token"))).unwrap();
        let token = keys.access_token(&reqwest::Client::new()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(token, "ya29.test");
    }

    #[tokio::test]
    async fn token_endpoint_error_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(400).json_body(json!({"error": "invalid_grant"}));
            })
            .await;

        let keys = ServiceAccountKeys::from_service_account(&account(&server.url("/token"))).unwrap();
        let err = keys.access_token(&reqwest::Client::new()).await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
