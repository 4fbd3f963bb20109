/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use duration_str::deserialize_duration;
use meterbridge_mqtt::{BackoffConfig, ClientOptions, ClientTlsConfig, ClientTlsIdentity, QoS};
use meterbridge_transform::RouteConfig;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
/// Configuration for meterbridge. Fields are documented as comments in the output of [`Config::into_annotated_config_file`].
pub struct Config {
    #[serde(default = "Defaults::listen_address")]
    pub listen_address: SocketAddr,
    #[serde(
        default = "Defaults::query_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub query_timeout: Duration,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub forwarder: ForwarderConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MqttConfig {
    #[serde(default = "Defaults::mqtt_host")]
    pub host: String,
    #[serde(default = "Defaults::mqtt_port")]
    pub port: u16,
    #[serde(default = "Defaults::mqtt_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ca_certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub client_cert_path: Option<PathBuf>,
    #[serde(default)]
    pub client_key_path: Option<PathBuf>,
    #[serde(default = "Defaults::mqtt_topics")]
    pub topics: Vec<String>,
    #[serde(default = "Defaults::mqtt_qos")]
    pub qos: u8,
    #[serde(
        default = "Defaults::mqtt_keep_alive",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub keep_alive: Duration,
    #[serde(default = "Defaults::mqtt_client_queue_size")]
    pub client_queue_size: usize,
    #[serde(default = "Defaults::mqtt_max_inflight")]
    pub max_inflight: u16,
    #[serde(
        default = "Defaults::mqtt_connect_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub connect_timeout: Duration,
    #[serde(
        default = "Defaults::reconnect_interval_base",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub reconnect_interval_base: Duration,
    #[serde(
        default = "Defaults::reconnect_interval_max",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub reconnect_interval_max: Duration,
    #[serde(
        default = "Defaults::successful_connection_minimum_duration",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub successful_connection_minimum_duration: Duration,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ForwarderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "Defaults::forwarder_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub apikey: String,
    #[serde(
        default = "Defaults::forwarder_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub interval: Duration,
    #[serde(
        default = "Defaults::forwarder_request_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        let config = toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        config.validate()?;
        Ok(config)
    }

    // validate rejects settings that parse fine but can't work, like a
    // zero forwarder interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("query_timeout", self.query_timeout),
            ("mqtt.connect_timeout", self.mqtt.connect_timeout),
            (
                "mqtt.reconnect_interval_base",
                self.mqtt.reconnect_interval_base,
            ),
            ("forwarder.interval", self.forwarder.interval),
            ("forwarder.request_timeout", self.forwarder.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroInterval { field });
            }
        }
        if self.mqtt.reconnect_interval_max < self.mqtt.reconnect_interval_base {
            return Err(ConfigError::ReconnectMaxBelowBase {
                base: self.mqtt.reconnect_interval_base,
                max: self.mqtt.reconnect_interval_max,
            });
        }
        Ok(())
    }

    pub fn into_annotated_config_file(self) -> String {
        let Self {
            listen_address,
            query_timeout,
            mqtt,
            forwarder,
            routes: _,
        } = self;
        let MqttConfig {
            host: mqtt_host,
            port: mqtt_port,
            client_id: mqtt_client_id,
            username: _,
            password: _,
            ca_certificate_path: _,
            client_cert_path: _,
            client_key_path: _,
            topics: mqtt_topics,
            qos: mqtt_qos,
            keep_alive: mqtt_keep_alive,
            client_queue_size: mqtt_client_queue_size,
            max_inflight: mqtt_max_inflight,
            connect_timeout: mqtt_connect_timeout,
            reconnect_interval_base,
            reconnect_interval_max,
            successful_connection_minimum_duration,
        } = mqtt;
        let ForwarderConfig {
            enabled: forwarder_enabled,
            endpoint: forwarder_endpoint,
            apikey: forwarder_apikey,
            interval: forwarder_interval,
            request_timeout: forwarder_request_timeout,
        } = forwarder;

        let listen_address = listen_address.to_string();
        let query_timeout = format_duration(query_timeout);
        let mqtt_keep_alive = format_duration(mqtt_keep_alive);
        let mqtt_connect_timeout = format_duration(mqtt_connect_timeout);
        let reconnect_interval_base = format_duration(reconnect_interval_base);
        let reconnect_interval_max = format_duration(reconnect_interval_max);
        let successful_connection_minimum_duration =
            format_duration(successful_connection_minimum_duration);
        let forwarder_interval = format_duration(forwarder_interval);
        let forwarder_request_timeout = format_duration(forwarder_request_timeout);

        let mqtt_topics = {
            let mut value = String::new();
            serde::Serialize::serialize(
                &mqtt_topics,
                toml::ser::ValueSerializer::new(&mut value),
            )
            .expect("BUG: default mqtt.topics did not serialize");
            value
        };

        format!(
            r##"
#####
## This is a default config file for meterbridge. Everything in this file is optional: Any
## non-comment line in this file simply represents default values. Commented lines with a single `#`
## represent examples for optional configuration which is not part of the default config.
#####

## What address to listen on for HTTP queries (GET /records/{{key}}).
listen_address = {listen_address:?}

## How long a record lookup may take before the query endpoint answers 504. Callers can pass their
## own with ?timeout_ms=<millis>.
query_timeout = {query_timeout:?}

[mqtt]
## Broker to subscribe to.
host = {mqtt_host:?}
port = {mqtt_port}

## Client id to connect with. The broker keeps a persistent session under this id, so it must be
## unique per meterbridge instance.
client_id = {mqtt_client_id:?}

## Optional credentials. Can also be set with MQTT_USERNAME / MQTT_PASSWORD.
# username = "<user>"
# password = "<password>"

## Optional TLS. Setting ca_certificate_path enables TLS; setting the client cert and key as well
## enables mTLS.
# ca_certificate_path = "/path/to/ca.crt"
# client_cert_path = "/path/to/tls.crt"
# client_key_path = "/path/to/tls.key"

## Topic filters to subscribe to (`+` and `#` wildcards allowed).
topics = {mqtt_topics}

## QoS to subscribe with (0, 1 or 2). Anything below 1 gives up redelivery of unprocessed messages.
qos = {mqtt_qos}

## MQTT keepalive interval.
keep_alive = {mqtt_keep_alive:?}

## How many received messages may wait for processing. When full, we stop reading from the broker
## until there is room again, rather than dropping anything.
client_queue_size = {mqtt_client_queue_size}

## Outgoing in-flight window.
max_inflight = {mqtt_max_inflight}

## How long to wait for the broker at startup before giving up.
connect_timeout = {mqtt_connect_timeout:?}

## How long to wait to reconnect after the first retry once the broker connection drops. Upon
## disconnection, a reconnect will happen immediately, but if that fails, this interval will be used
## for the next reconnect. It will grow every successive reconnect (with random jitter) up to a
## maximum of `reconnect_interval_max`.
reconnect_interval_base = {reconnect_interval_base:?}

## The maximum interval to wait between reconnects.
reconnect_interval_max = {reconnect_interval_max:?}

## How long should a connection to the broker be up before it's considered a successful
## connection, and the backoff is reset to zero.
successful_connection_minimum_duration = {successful_connection_minimum_duration:?}

## Periodically post the latest values, grouped by node, to an emoncms input API.
[forwarder]
enabled = {forwarder_enabled}

## Base URL of emoncms. Values are posted to <endpoint>/input/post.
endpoint = {forwarder_endpoint:?}

## emoncms write API key.
apikey = {forwarder_apikey:?}

## How often to post.
interval = {forwarder_interval:?}

## Timeout for each post.
request_timeout = {forwarder_request_timeout:?}

## Topic routes decide how messages are decoded. With no routes, every topic is read as a JSON
## object: {{"key": "...", "value": <number|bool|string>, "version": <integer>, "node": "..."}}.
## Routes are tried in order and the first match wins. A pattern containing regex metacharacters is
## a regex, otherwise it is an MQTT topic filter whose wildcards become capture groups ${{1}}, ${{2}}...
#
# [[routes]]
# # Plain numbers published per sensor; key and node come from the topic, version from arrival time.
# pattern = '^slimmelezer/sensor/(?P<name>\S+)/state$'
# format = "scalar"
# key = "${{name}}"
# node = "slimmelezer"
#
# [[routes]]
# pattern = "evcc/loadpoints/+/+"
# format = "scalar"
# key = "loadpoint${{1}}_${{2}}"
# node = "evcc"
#
# [[routes]]
# # Everything else as JSON records
# pattern = "#"
# format = "json"
"##
        )
    }
}

impl MqttConfig {
    // client_options turns the broker settings into subscriber options,
    // reading TLS material from disk.
    pub fn client_options(&self) -> Result<ClientOptions, ConfigError> {
        let qos = match self.qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            other => return Err(ConfigError::InvalidQos(other)),
        };

        let mut options = ClientOptions::default()
            .with_keep_alive(self.keep_alive)
            .with_qos(qos)
            .with_client_queue_size(self.client_queue_size)
            .with_max_inflight(self.max_inflight)
            .with_connect_timeout(self.connect_timeout)
            .with_backoff(BackoffConfig {
                base: self.reconnect_interval_base,
                max: self.reconnect_interval_max,
                successful_connection_minimum_duration: self
                    .successful_connection_minimum_duration,
            });

        match (&self.username, &self.password) {
            (Some(username), password) => {
                options = options.with_credentials(username, password.clone().unwrap_or_default());
            }
            (None, Some(_)) => return Err(ConfigError::PasswordWithoutUsername),
            (None, None) => {}
        }

        if let Some(ca_certificate_path) = &self.ca_certificate_path {
            let client_identity = match (&self.client_cert_path, &self.client_key_path) {
                (Some(cert_path), Some(key_path)) => Some(ClientTlsIdentity {
                    certificate: read_file(cert_path)?,
                    private_key: read_file(key_path)?,
                }),
                (None, None) => None,
                _ => return Err(ConfigError::IncompleteClientIdentity),
            };
            options = options.with_tls_config(ClientTlsConfig {
                ca_certificate: read_file(ca_certificate_path)?,
                client_identity,
            });
        } else if self.client_cert_path.is_some() || self.client_key_path.is_some() {
            return Err(ConfigError::ClientIdentityWithoutCa);
        }

        Ok(options)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|error| ConfigError::CouldNotRead {
        path: path.to_string_lossy().to_string(),
        error,
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: Defaults::listen_address(),
            query_timeout: Defaults::query_timeout(),
            mqtt: MqttConfig::default(),
            forwarder: ForwarderConfig::default(),
            routes: vec![],
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: Defaults::mqtt_host(),
            port: Defaults::mqtt_port(),
            client_id: Defaults::mqtt_client_id(),
            username: None,
            password: None,
            ca_certificate_path: None,
            client_cert_path: None,
            client_key_path: None,
            topics: Defaults::mqtt_topics(),
            qos: Defaults::mqtt_qos(),
            keep_alive: Defaults::mqtt_keep_alive(),
            client_queue_size: Defaults::mqtt_client_queue_size(),
            max_inflight: Defaults::mqtt_max_inflight(),
            connect_timeout: Defaults::mqtt_connect_timeout(),
            reconnect_interval_base: Defaults::reconnect_interval_base(),
            reconnect_interval_max: Defaults::reconnect_interval_max(),
            successful_connection_minimum_duration:
                Defaults::successful_connection_minimum_duration(),
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: Defaults::forwarder_endpoint(),
            apikey: String::new(),
            interval: Defaults::forwarder_interval(),
            request_timeout: Defaults::forwarder_request_timeout(),
        }
    }
}

pub struct Defaults;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file at {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("TOML error reading config file at {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error(
        "mqtt.reconnect_interval_max ({max:?}) must not be less than mqtt.reconnect_interval_base ({base:?})"
    )]
    ReconnectMaxBelowBase { base: Duration, max: Duration },
    #[error("Invalid mqtt.qos {0}, must be 0, 1 or 2")]
    InvalidQos(u8),
    #[error("mqtt.password is set but mqtt.username is not")]
    PasswordWithoutUsername,
    #[error("mqtt.client_cert_path and mqtt.client_key_path must be set together")]
    IncompleteClientIdentity,
    #[error("mqtt.client_cert_path and mqtt.client_key_path require mqtt.ca_certificate_path")]
    ClientIdentityWithoutCa,
}

impl Defaults {
    pub fn listen_address() -> SocketAddr {
        "[::]:8080"
            .parse()
            .expect("BUG: default listen_address is invalid")
    }

    pub fn query_timeout() -> Duration {
        Duration::from_secs(5)
    }

    pub fn mqtt_host() -> String {
        "127.0.0.1".to_string()
    }

    pub fn mqtt_port() -> u16 {
        1883
    }

    pub fn mqtt_client_id() -> String {
        "meterbridge".to_string()
    }

    pub fn mqtt_topics() -> Vec<String> {
        vec!["#".to_string()]
    }

    pub fn mqtt_qos() -> u8 {
        1
    }

    pub fn mqtt_keep_alive() -> Duration {
        Duration::from_secs(30)
    }

    pub fn mqtt_client_queue_size() -> usize {
        1024
    }

    pub fn mqtt_max_inflight() -> u16 {
        100
    }

    pub fn mqtt_connect_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub fn reconnect_interval_base() -> Duration {
        Duration::from_secs(1)
    }

    pub fn reconnect_interval_max() -> Duration {
        Duration::from_secs(60)
    }

    pub fn successful_connection_minimum_duration() -> Duration {
        Duration::from_secs(30)
    }

    pub fn forwarder_endpoint() -> String {
        "http://127.0.0.1/emoncms".to_string()
    }

    pub fn forwarder_interval() -> Duration {
        Duration::from_secs(5)
    }

    pub fn forwarder_request_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

// format_duration renders whole seconds as "<n>s" and anything finer as
// "<n>ms", both of which deserialize_duration reads back.
fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
