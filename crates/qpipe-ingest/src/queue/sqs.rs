//! AWS SQS queue

use super::{Queue, QueuedMessage};
use crate::config::QueueConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    name: String,
    url: String,
    wait_time_secs: i32,
    visibility_timeout_secs: i32,
}

impl SqsQueue {
    /// Connect to the queue named in `config`, creating it if it does not exist.
    ///
    /// Credentials come from the default AWS provider chain.
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        debug!("Initializing SQS client with config: {:?}", config);

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let client = Client::new(&loader.load().await);
        let url = Self::resolve_queue_url(&client, &config.name).await?;

        info!(queue = %config.name, url = %url, "SQS queue resolved");

        Ok(Self {
            client,
            name: config.name.clone(),
            url,
            wait_time_secs: config.wait_time_secs,
            visibility_timeout_secs: config.visibility_timeout_secs,
        })
    }

    async fn resolve_queue_url(client: &Client, name: &str) -> Result<String> {
        match client.get_queue_url().queue_name(name).send().await {
            Ok(output) => output
                .queue_url()
                .map(str::to_string)
                .ok_or_else(|| IngestError::queue(format!("no URL returned for queue '{}'", name))),
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(|e| e.is_queue_does_not_exist());
                if !missing {
                    return Err(IngestError::queue(DisplayErrorContext(&err)));
                }

                info!(queue = %name, "Queue does not exist, creating it");
                client
                    .create_queue()
                    .queue_name(name)
                    .send()
                    .await
                    .map_err(|e| IngestError::queue(DisplayErrorContext(&e)))?
                    .queue_url()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        IngestError::queue(format!("no URL returned creating queue '{}'", name))
                    })
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Queue for SqsQueue {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, body), fields(queue = %self.name, bytes = body.len()))]
    async fn publish(&self, body: String) -> Result<()> {
        self.client
            .send_message()
            .queue_url(&self.url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| IngestError::queue(DisplayErrorContext(&e)))?;
        Ok(())
    }

    #[instrument(skip(self), fields(queue = %self.name))]
    async fn poll_next(&self) -> Result<Option<QueuedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.wait_time_secs)
            .visibility_timeout(self.visibility_timeout_secs)
            .send()
            .await
            .map_err(|e| IngestError::queue(DisplayErrorContext(&e)))?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };

        let receipt = message
            .receipt_handle()
            .ok_or_else(|| IngestError::queue("received message without a receipt handle"))?;

        Ok(Some(QueuedMessage {
            id: message.message_id().unwrap_or_default().to_string(),
            body: message.body().unwrap_or_default().to_string(),
            receipt: receipt.to_string(),
        }))
    }

    #[instrument(skip(self, message), fields(queue = %self.name, message_id = %message.id))]
    async fn delete(&self, message: &QueuedMessage) -> Result<()> {
        let result = self
            .client
            .delete_message()
            .queue_url(&self.url)
            .receipt_handle(&message.receipt)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_receipt_handle_is_invalid() || e.is_invalid_id_format()) =>
            {
                debug!("Receipt handle no longer valid, nothing to delete");
                Ok(())
            },
            Err(err) => Err(IngestError::queue(DisplayErrorContext(&err))),
        }
    }

    async fn approximate_len(&self) -> Result<Option<u64>> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(&self.url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| IngestError::queue(DisplayErrorContext(&e)))?;

        Ok(output
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|count| count.parse().ok()))
    }
}
