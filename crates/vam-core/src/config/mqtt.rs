//! Translation of [`MqttSettings`] into `rumqttc` types.
//!
//! Both the bridge publisher and the keystroke consumer build their client
//! options here.  Nothing in this module opens a connection.

use std::time::Duration;

use rumqttc::{MqttOptions, QoS};

use super::{MqttSettings, QosLevel};

impl From<QosLevel> for QoS {
    fn from(qos: QosLevel) -> QoS {
        match qos {
            QosLevel::AtMostOnce => QoS::AtMostOnce,
            QosLevel::AtLeastOnce => QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

impl MqttSettings {
    /// Client options with a unique `<prefix>-<uuid>` client id and a clean
    /// session.
    pub fn client_options(&self) -> MqttOptions {
        let client_id = format!("{}-{}", self.client_id_prefix, uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, self.broker.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        options.set_clean_session(true);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_mapping() {
        assert_eq!(QoS::from(QosLevel::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(QoS::from(QosLevel::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(QoS::from(QosLevel::ExactlyOnce), QoS::ExactlyOnce);
    }

    #[test]
    fn test_client_id_uses_prefix_and_is_unique() {
        let settings = MqttSettings {
            client_id_prefix: "vam-bridge".to_string(),
            ..MqttSettings::default()
        };
        let a = settings.client_options();
        let b = settings.client_options();
        assert!(a.client_id().starts_with("vam-bridge-"));
        assert_ne!(a.client_id(), b.client_id());
    }

    #[test]
    fn test_options_carry_keep_alive_broker_and_clean_session() {
        let settings = MqttSettings {
            broker: "broker.local".to_string(),
            port: 1884,
            keep_alive_secs: 30,
            ..MqttSettings::default()
        };
        let options = settings.client_options();
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1884));
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert!(options.clean_session());
    }
}
