//! Snapshot of the page context every sample is stamped with.

use vitals_core::sample::{BatchMeta, ConnectionType, DeviceType, Dimensions, NavigationType};

const DEFAULT_VIEWPORT: Dimensions = Dimensions {
    width: 1280,
    height: 800,
};

/// Page-level facts read once at configuration time.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEnvironment {
    pub url: String,
    pub user_agent: String,
    pub viewport: Dimensions,
    pub screen: Dimensions,
    pub navigation_type: NavigationType,
    pub connection: ConnectionType,
}

impl Default for PageEnvironment {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_agent: default_user_agent(),
            viewport: DEFAULT_VIEWPORT,
            screen: DEFAULT_VIEWPORT,
            navigation_type: NavigationType::Navigate,
            connection: ConnectionType::unknown(),
        }
    }
}

impl PageEnvironment {
    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_viewport_width(self.viewport.width)
    }

    pub fn meta(&self) -> BatchMeta {
        BatchMeta {
            user_agent: self.user_agent.clone(),
            viewport: self.viewport,
            screen: self.screen,
        }
    }

    /// Read the page context from the environment, falling back to
    /// [`Default`] for anything unset or unparseable.
    ///
    /// | Env Var               | Default      |
    /// |-----------------------|--------------|
    /// | `CWV_PAGE_URL`        | empty        |
    /// | `CWV_VIEWPORT_WIDTH`  | `1280`       |
    /// | `CWV_VIEWPORT_HEIGHT` | `800`        |
    /// | `CWV_NAVIGATION_TYPE` | `navigate`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let viewport = Dimensions {
            width: env_u32("CWV_VIEWPORT_WIDTH").unwrap_or(defaults.viewport.width),
            height: env_u32("CWV_VIEWPORT_HEIGHT").unwrap_or(defaults.viewport.height),
        };

        let navigation_type = std::env::var("CWV_NAVIGATION_TYPE")
            .map(|v| NavigationType::from_label(&v))
            .unwrap_or(defaults.navigation_type);

        Self {
            url: std::env::var("CWV_PAGE_URL").unwrap_or(defaults.url),
            viewport,
            screen: viewport,
            navigation_type,
            ..defaults
        }
    }
}

fn env_u32(var: &str) -> Option<u32> {
    std::env::var(var).ok()?.trim().parse().ok()
}

fn default_user_agent() -> String {
    format!("vitals-collector/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_follows_viewport_width() {
        let mut env = PageEnvironment::default();
        assert_eq!(env.device_type(), DeviceType::Desktop);

        env.viewport.width = 800;
        assert_eq!(env.device_type(), DeviceType::Tablet);

        env.viewport.width = 500;
        assert_eq!(env.device_type(), DeviceType::Mobile);
    }

    #[test]
    fn meta_carries_dimensions_and_agent() {
        let env = PageEnvironment {
            viewport: Dimensions {
                width: 390,
                height: 844,
            },
            ..PageEnvironment::default()
        };
        let meta = env.meta();
        assert_eq!(meta.viewport.width, 390);
        assert!(meta.user_agent.starts_with("vitals-collector/"));
    }
}
