use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::ClientConfig;
use crate::error::cinwiki::{ClientError, FrameError};
use crate::model::course::{CourseQuery, CourseRecord, ResponseLine};
use crate::wire::framing::{ReadLimits, read_message, write_message};

/// Resolves a course query to a record. The chat adapter only sees this.
#[async_trait]
pub trait CourseLookup: Send + Sync {
    async fn find(&self, query: &CourseQuery) -> Result<CourseRecord, ClientError>;
}

/// Talks to the query server: one fresh connection per lookup.
#[derive(Debug, Clone)]
pub struct QueryClient {
    config: ClientConfig,
}

impl QueryClient {
    pub fn new(config: ClientConfig) -> Self {
        QueryClient { config }
    }

    /// Sends `query` and returns the raw reply.
    ///
    /// The configured timeout bounds connecting, sending and receiving taken
    /// together.
    pub async fn lookup(&self, query: &CourseQuery) -> Result<ResponseLine, ClientError> {
        let addr = self.config.addr();
        let limit = self.config.timeout();

        let exchange = async {
            let mut stream = TcpStream::connect(&addr)
                .await
                .map_err(|source| ClientError::Connect {
                    addr: addr.clone(),
                    source,
                })?;
            log::debug!("connected to {} for {}", addr, query);

            let framing = self.config.framing;
            write_message(&mut stream, framing, query.code.as_bytes(), limit).await?;
            let limits = ReadLimits {
                max: self.config.max_response_bytes,
                deadline: limit,
                idle: self.config.raw_idle(),
            };
            Ok::<_, ClientError>(read_message(&mut stream, framing, limits).await?)
        };

        let result = timeout(limit, exchange).await;
        let reply = match result {
            Ok(Ok(reply)) => reply,
            Ok(Err(ClientError::Frame(FrameError::Timeout(_)))) | Err(_) => {
                return Err(ClientError::Timeout { addr, timeout: limit });
            }
            Ok(Err(err)) => return Err(err),
        };

        let line = ResponseLine::new(String::from_utf8_lossy(&reply));
        log::debug!("{} answered {:?}", addr, line.as_str());
        Ok(line)
    }
}

#[async_trait]
impl CourseLookup for QueryClient {
    async fn find(&self, query: &CourseQuery) -> Result<CourseRecord, ClientError> {
        let line = self.lookup(query).await?;
        Ok(line.split()?)
    }
}
