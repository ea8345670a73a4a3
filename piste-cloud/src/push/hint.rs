//! Platform-specific delivery hints
//!
//! Computed once per target and rendered by the provider; a new platform
//! adds a variant here instead of branches in the send path.

use shared::models::DevicePlatform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryHint {
    /// High priority with default sound, Android channel
    Mobile { sound: String, channel_id: String },
    /// Click-through link on the canonical app origin
    Web { link: String },
}

/// Settings the hints are derived from
#[derive(Debug, Clone)]
pub struct HintContext {
    pub app_base_url: String,
    pub android_channel_id: String,
}

impl DeliveryHint {
    /// `path` must already be normalized
    pub fn for_platform(platform: DevicePlatform, path: &str, ctx: &HintContext) -> Self {
        match platform {
            DevicePlatform::Ios | DevicePlatform::Android => Self::Mobile {
                sound: "default".into(),
                channel_id: ctx.android_channel_id.clone(),
            },
            DevicePlatform::Web => Self::Web {
                link: format!("{}{}", ctx.app_base_url.trim_end_matches('/'), path),
            },
        }
    }
}

/// Deep-link path always starts with `/`; empty becomes `/`
pub fn normalize_path(path: Option<&str>) -> String {
    match path.map(str::trim) {
        None | Some("") => "/".to_string(),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("/{p}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HintContext {
        HintContext {
            app_base_url: "https://piste.app/".into(),
            android_channel_id: "bookings".into(),
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(None), "/");
        assert_eq!(normalize_path(Some("  ")), "/");
        assert_eq!(normalize_path(Some("classes/7")), "/classes/7");
        assert_eq!(normalize_path(Some("/chat/3")), "/chat/3");
    }

    #[test]
    fn test_hint_per_platform() {
        assert_eq!(
            DeliveryHint::for_platform(DevicePlatform::Web, "/classes/7", &ctx()),
            DeliveryHint::Web {
                link: "https://piste.app/classes/7".into()
            }
        );
        assert_eq!(
            DeliveryHint::for_platform(DevicePlatform::Ios, "/", &ctx()),
            DeliveryHint::Mobile {
                sound: "default".into(),
                channel_id: "bookings".into()
            }
        );
    }
}
