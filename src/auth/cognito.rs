use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::{
    error::DisplayErrorContext,
    types::{AuthFlowType, AuthenticationResultType},
    Client,
};
use tracing::{info, instrument};

use crate::auth::{IdentityProvider, Session, SignInOutcome};
use crate::error::AuthError;

/// Cognito user pool app client using the `USER_PASSWORD_AUTH` flow.
#[derive(Debug, Clone)]
pub struct CognitoIdentity {
    client: Client,
    user_pool_id: String,
    client_id: String,
}

/// Pool ids are prefixed with their region: `eu-west-1_AbCdEf` -> `eu-west-1`.
pub fn region_from_pool_id(user_pool_id: &str) -> Option<&str> {
    user_pool_id
        .split_once('_')
        .map(|(region, _)| region)
        .filter(|region| !region.is_empty())
}

fn provider_error<E: std::error::Error>(err: E) -> AuthError {
    AuthError::Provider(DisplayErrorContext(&err).to_string())
}

fn session_from(
    username: &str,
    result: &AuthenticationResultType,
    previous_refresh_token: Option<&str>,
) -> Result<Session, AuthError> {
    let id_token = result
        .id_token()
        .ok_or_else(|| AuthError::Provider("response carried no id token".to_string()))?;
    Ok(Session {
        username: username.to_string(),
        id_token: id_token.to_string(),
        access_token: result.access_token().map(str::to_owned),
        // Refresh responses do not repeat the refresh token.
        refresh_token: result
            .refresh_token()
            .or(previous_refresh_token)
            .map(str::to_owned),
    })
}

impl CognitoIdentity {
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        user_pool_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(sdk_config),
            user_pool_id: user_pool_id.into(),
            client_id: client_id.into(),
        }
    }

    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    #[instrument(skip(self, password), fields(user_pool = %self.user_pool_id))]
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInOutcome, AuthError> {
        let output = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password)
            .send()
            .await
            .map_err(provider_error)?;

        if let Some(result) = output.authentication_result() {
            info!("Authentication succeeded");
            return session_from(username, result, None).map(SignInOutcome::SignedIn);
        }
        match output.challenge_name() {
            Some(challenge) => Ok(SignInOutcome::Challenge {
                name: challenge.as_str().to_string(),
            }),
            None => Err(AuthError::Provider(
                "response carried neither tokens nor a challenge".to_string(),
            )),
        }
    }

    #[instrument(skip_all, fields(user_pool = %self.user_pool_id, username = %session.username))]
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NotSignedIn)?;

        let output = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::RefreshTokenAuth)
            .client_id(&self.client_id)
            .auth_parameters("REFRESH_TOKEN", refresh_token)
            .send()
            .await
            .map_err(provider_error)?;

        let result = output
            .authentication_result()
            .ok_or_else(|| AuthError::Provider("refresh returned no tokens".to_string()))?;
        session_from(&session.username, result, Some(refresh_token))
    }

    #[instrument(skip_all, fields(user_pool = %self.user_pool_id, username = %session.username))]
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let Some(access_token) = session.access_token.as_deref() else {
            return Ok(());
        };
        self.client
            .global_sign_out()
            .access_token(access_token)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_taken_from_pool_id() {
        assert_eq!(region_from_pool_id("eu-west-1_AbCdEf"), Some("eu-west-1"));
        assert_eq!(region_from_pool_id("no-underscore"), None);
        assert_eq!(region_from_pool_id("_AbCdEf"), None);
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let result = AuthenticationResultType::builder()
            .id_token("id")
            .access_token("access")
            .build();
        let session = session_from("alice", &result, Some("old-refresh")).unwrap();
        assert_eq!(session.id_token, "id");
        assert_eq!(session.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[test]
    fn missing_id_token_is_an_error() {
        let result = AuthenticationResultType::builder()
            .access_token("access")
            .build();
        assert!(session_from("alice", &result, None).is_err());
    }
}
