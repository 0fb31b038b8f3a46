use domain::error::Error as DomainError;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query of `GET /<export>.png`. A `version` given here takes precedence
/// over the long-polling cookie.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageParams {
    /// Last version the client has seen.
    pub version: Option<String>,
}

/// Query of the `GET /<export>` landing page.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LandingPageParams {
    /// Image refresh period in milliseconds.
    #[serde(rename = "updatePeriod")]
    pub update_period: Option<String>,
}

pub(crate) fn parse_version_token(token: &str) -> Result<u64, DomainError> {
    token
        .trim()
        .parse::<u64>()
        .map_err(DomainError::malformed_version_token)
}
