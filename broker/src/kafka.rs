//! Kafka-backed announcement log.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use rskafka::client::consumer::{StartOffset, StreamConsumerBuilder};
use rskafka::client::error::{Error as KafkaError, ProtocolError};
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder, SaslConfig};
use rskafka::record::{Record, RecordAndOffset};

use peerwarden_types::NodeAddress;

use crate::log::decode_record;
use crate::{Announcement, AnnouncementLog, BrokerConfig, BrokerError};

/// Announcements always live in the first (and only) partition.
const PARTITION: i32 = 0;

/// Broker-side timeout for topic creation.
const CREATE_TOPIC_TIMEOUT_MS: i32 = 5_000;

/// How long a fetch may park on the broker when caught up to the tail.
const FETCH_MAX_WAIT_MS: i32 = 500;

type RecordStream = BoxStream<'static, Result<(RecordAndOffset, i64), KafkaError>>;

/// Topic layout used when the topic has to be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicSettings {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i16,
}

impl TopicSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication_factor: 3,
        }
    }
}

/// Producer and from-the-start consumer over one topic partition.
pub struct KafkaLog {
    topic: String,
    partition: Arc<PartitionClient>,
    records: RecordStream,
}

impl KafkaLog {
    /// Connect, make sure the topic exists, and position a consumer at the
    /// earliest retained offset.
    pub async fn connect(config: &BrokerConfig, topic: &TopicSettings) -> Result<Self, BrokerError> {
        let client = build_client(config).await?;
        ensure_topic(&client, topic).await?;

        let partition = Arc::new(
            client
                .partition_client(topic.name.clone(), PARTITION, UnknownTopicHandling::Retry)
                .await?,
        );
        let records = StreamConsumerBuilder::new(Arc::clone(&partition), StartOffset::Earliest)
            .with_max_wait_ms(FETCH_MAX_WAIT_MS)
            .build()
            .boxed();

        tracing::info!(topic = %topic.name, brokers = ?config.bootstrap_servers, "announcement log ready");
        Ok(Self {
            topic: topic.name.clone(),
            partition,
            records,
        })
    }
}

#[async_trait]
impl AnnouncementLog for KafkaLog {
    async fn announce(&mut self, address: &NodeAddress) -> Result<(), BrokerError> {
        let record = Record {
            key: None,
            value: Some(address.as_bytes().to_vec()),
            headers: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        };
        // Gzip is explicit so consumers never need an optional codec.
        let offsets = self.partition.produce(vec![record], Compression::Gzip).await?;
        tracing::debug!(topic = %self.topic, ?offsets, "announcement produced");
        Ok(())
    }

    async fn next_announcement(&mut self) -> Result<Announcement, BrokerError> {
        loop {
            let (item, high_watermark) = self
                .records
                .next()
                .await
                .ok_or(BrokerError::StreamClosed)??;

            match decode_record(item.record.value.as_deref()) {
                Some(address) => {
                    return Ok(Announcement {
                        offset: item.offset,
                        address,
                    })
                }
                None => {
                    tracing::warn!(
                        topic = %self.topic,
                        offset = item.offset,
                        high_watermark,
                        "skipping record that is not a UTF-8 node address"
                    );
                }
            }
        }
    }
}

async fn build_client(config: &BrokerConfig) -> Result<Client, BrokerError> {
    let mut builder = ClientBuilder::new(config.bootstrap_servers.clone());
    if let Some(sasl) = &config.sasl {
        builder = builder.sasl_config(SaslConfig::Plain {
            username: sasl.username.clone(),
            password: sasl.password.clone(),
        });
    }
    if config.tls {
        builder = builder.tls_config(Arc::new(tls_client_config()));
    }
    Ok(builder.build().await?)
}

async fn ensure_topic(client: &Client, topic: &TopicSettings) -> Result<(), BrokerError> {
    let controller = client.controller_client()?;
    match controller
        .create_topic(
            topic.name.clone(),
            topic.partitions,
            topic.replication_factor,
            CREATE_TOPIC_TIMEOUT_MS,
        )
        .await
    {
        Ok(()) => {
            tracing::info!(
                topic = %topic.name,
                partitions = topic.partitions,
                replication_factor = topic.replication_factor,
                "created announcement topic"
            );
            Ok(())
        }
        Err(KafkaError::ServerError {
            protocol_error: ProtocolError::TopicAlreadyExists,
            ..
        }) => {
            tracing::debug!(topic = %topic.name, "announcement topic already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn tls_client_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));
    rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topic_layout() {
        let settings = TopicSettings::new("trusted-peers");
        assert_eq!(settings.partitions, 1);
        assert_eq!(settings.replication_factor, 3);
    }

    #[test]
    fn every_broker_codec_is_compiled_in() {
        // Other producers on the topic may use any codec; a batch the
        // consumer cannot decompress would end the replay.
        let codecs = [
            Compression::NoCompression,
            Compression::Gzip,
            Compression::Lz4,
            Compression::Snappy,
            Compression::Zstd,
        ];
        assert_eq!(codecs.len(), 5);
    }
}
