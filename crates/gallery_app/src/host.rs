use gallery_core::TabId;
use gallery_engine::BadgeSetter;
use gallery_logging::gallery_info;

/// Badge setter for a headless host: the badge only exists in the log.
#[derive(Debug, Default)]
pub struct LoggingBadge;

impl BadgeSetter for LoggingBadge {
    fn set_text(&self, tab: TabId, text: &str) {
        gallery_info!("Badge text for tab {}: {:?}", tab, text);
    }

    fn set_background(&self, tab: TabId, color: &str) {
        gallery_info!("Badge color for tab {}: {}", tab, color);
    }
}
