use serde::{Deserialize, Serialize};

/// Marketing-attribution parameters captured at checkout time. Every field
/// is optional; storefronts send whatever the landing page had in its query
/// string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackingParameters {
    pub src: Option<String>,
    pub sck: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
}

impl TrackingParameters {
    pub fn is_empty(&self) -> bool {
        self.src.is_none()
            && self.sck.is_none()
            && self.utm_source.is_none()
            && self.utm_medium.is_none()
            && self.utm_campaign.is_none()
            && self.utm_content.is_none()
            && self.utm_term.is_none()
    }
}
