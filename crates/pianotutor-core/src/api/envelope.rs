//! The `{code, msg, data}` wrapper every API response uses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Which embedded status signals application-level success.
///
/// Backends disagree on this, so it is configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessConvention {
    /// `code == 200`
    #[default]
    Code200,
    /// `code == 0` and `msg == "Success"`
    ZeroWithSuccessMsg,
}

impl SuccessConvention {
    pub fn is_success(&self, code: i32, msg: &str) -> bool {
        match self {
            SuccessConvention::Code200 => code == 200,
            SuccessConvention::ZeroWithSuccessMsg => code == 0 && msg == "Success",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "code200" | "200" => Some(SuccessConvention::Code200),
            "zero_with_success_msg" | "zero" | "0" => Some(SuccessConvention::ZeroWithSuccessMsg),
            _ => None,
        }
    }
}

impl<T> Envelope<T> {
    pub fn is_success(&self, convention: SuccessConvention) -> bool {
        convention.is_success(self.code, &self.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope_with_data() {
        let json = r#"{"code":200,"msg":"Success","data":{"token":"abc"}}"#;
        let env: Envelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert_eq!(env.code, 200);
        assert_eq!(env.data.unwrap()["token"], "abc");
    }

    #[test]
    fn test_parse_envelope_without_msg_or_data() {
        let env: Envelope<String> = serde_json::from_str(r#"{"code":500}"#).unwrap();
        assert_eq!(env.msg, "");
        assert_eq!(env.data, None);

        let env: Envelope<String> =
            serde_json::from_str(r#"{"code":200,"msg":"ok","data":null}"#).unwrap();
        assert_eq!(env.data, None);
    }

    #[test]
    fn test_code200_convention() {
        let c = SuccessConvention::Code200;
        assert!(c.is_success(200, "anything"));
        assert!(!c.is_success(0, "Success"));
        assert!(!c.is_success(500, "Success"));
    }

    #[test]
    fn test_zero_convention() {
        let c = SuccessConvention::ZeroWithSuccessMsg;
        assert!(c.is_success(0, "Success"));
        assert!(!c.is_success(0, "success"));
        assert!(!c.is_success(200, "Success"));
    }

    #[test]
    fn test_convention_from_str() {
        assert_eq!(SuccessConvention::from_str("code200"), Some(SuccessConvention::Code200));
        assert_eq!(
            SuccessConvention::from_str(" Zero_With_Success_Msg "),
            Some(SuccessConvention::ZeroWithSuccessMsg)
        );
        assert_eq!(SuccessConvention::from_str("maybe"), None);
    }

    #[test]
    fn test_convention_serde_names() {
        assert_eq!(
            serde_json::to_string(&SuccessConvention::ZeroWithSuccessMsg).unwrap(),
            r#""zero_with_success_msg""#
        );
        let c: SuccessConvention = serde_json::from_str(r#""code200""#).unwrap();
        assert_eq!(c, SuccessConvention::Code200);
    }
}
