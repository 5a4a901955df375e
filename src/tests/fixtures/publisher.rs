// Publisher settings used by unit tests.

use crate::modules::events::use_cases::publish_events::publisher::PublisherSettings;
use std::time::Duration;

pub const TOPIC: &str = "eventsource";

pub fn make_publisher_settings(partitions: u32) -> PublisherSettings {
    PublisherSettings {
        topic: TOPIC.to_string(),
        partitions,
        padding_size: 16,
        publish_timeout: Duration::from_secs(1),
    }
}
