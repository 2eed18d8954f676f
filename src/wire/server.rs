use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::core::fetcher::PageSource;
use crate::core::html_parser::extract_course;
use crate::error::cinwiki::ServerError;
use crate::model::course::{CourseQuery, CourseRecord};
use crate::wire::framing::{ReadLimits, read_message, write_message};

/// How one connection was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(CourseRecord),
    /// The page had no infobox with both a caption and a linked cell.
    NotFound(CourseRecord),
    /// The request was not a usable course code.
    Rejected,
    /// Fetching or parsing the page failed, timed out or panicked.
    UpstreamFailed,
}

#[derive(Debug, Default)]
pub struct ServerStats {
    found: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub found: u64,
    /// Not-found pages and rejected codes.
    pub not_found: u64,
    /// Upstream failures and connections that could not be answered.
    pub failed: u64,
}

impl ServerStats {
    fn record(&self, outcome: &Result<Outcome, ServerError>) {
        let counter = match outcome {
            Ok(Outcome::Found(_)) => &self.found,
            Ok(Outcome::NotFound(_) | Outcome::Rejected) => &self.not_found,
            Ok(Outcome::UpstreamFailed) | Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            found: self.found.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Answers course lookups on the private link, one connection at a time.
///
/// Each accepted connection is fully read, answered and closed before the
/// next `accept`. Fetching and parsing run in their own task: a panic there
/// is answered with the empty line like any other upstream failure.
pub struct QueryServer {
    listener: TcpListener,
    config: ServerConfig,
    source: Arc<dyn PageSource>,
    stats: Arc<ServerStats>,
}

impl QueryServer {
    pub async fn bind(
        config: ServerConfig,
        source: Arc<dyn PageSource>,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(QueryServer {
            listener,
            config,
            source,
            stats: Arc::new(ServerStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::Accept)
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Serves connections until the process exits.
    pub async fn run(self) {
        match self.local_addr() {
            Ok(addr) => log::info!("listening on {} ({:?} framing)", addr, self.config.framing),
            Err(err) => log::warn!("listening on unknown address: {}", err),
        }

        loop {
            match self.serve_one().await {
                Ok(outcome) => log::debug!("{:?}, totals {:?}", outcome, self.stats.snapshot()),
                Err(ServerError::Accept(err)) => {
                    log::error!("accept failed: {}", err);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(err) => log::warn!("request dropped: {}", err),
            }
        }
    }

    /// Accepts one connection and answers it.
    pub async fn serve_one(&self) -> Result<Outcome, ServerError> {
        let (stream, peer) = self.listener.accept().await.map_err(ServerError::Accept)?;
        log::info!("connection from {}", peer);

        let handler = ConnectionHandler {
            config: self.config.clone(),
            source: Arc::clone(&self.source),
        };
        let outcome = handler.handle(stream).await;

        self.stats.record(&outcome);
        outcome
    }
}

struct ConnectionHandler {
    config: ServerConfig,
    source: Arc<dyn PageSource>,
}

impl ConnectionHandler {
    async fn handle(self, mut stream: TcpStream) -> Result<Outcome, ServerError> {
        let limits = ReadLimits {
            max: self.config.max_request_bytes,
            deadline: self.config.read_timeout(),
            idle: self.config.raw_idle(),
        };
        let request = read_message(&mut stream, self.config.framing, limits).await?;
        let code = String::from_utf8_lossy(&request).into_owned();

        let lookup = tokio::spawn(answer(self.config.clone(), self.source, code));
        let (record, outcome) = match lookup.await {
            Ok(answered) => answered,
            Err(err) => {
                log::error!("lookup task failed: {}", err);
                (CourseRecord::empty(), Outcome::UpstreamFailed)
            }
        };

        let line = record.to_line();
        log::info!("sending back: {}", line);
        write_message(
            &mut stream,
            self.config.framing,
            line.as_str().as_bytes(),
            self.config.write_timeout(),
        )
        .await?;

        Ok(outcome)
    }
}

/// Every failure here is answered with an empty record.
async fn answer(
    config: ServerConfig,
    source: Arc<dyn PageSource>,
    raw: String,
) -> (CourseRecord, Outcome) {
    let query = match CourseQuery::parse(&raw) {
        Ok(query) => query,
        Err(err) => {
            log::warn!("rejecting request: {}", err);
            return (CourseRecord::empty(), Outcome::Rejected);
        }
    };
    log::info!("looking up {}", query);

    let html = match tokio::time::timeout(config.fetch_timeout(), source.fetch(&query)).await {
        Ok(Ok(html)) => html,
        Ok(Err(err)) => {
            log::warn!("fetching {} failed: {}", query, err);
            return (CourseRecord::empty(), Outcome::UpstreamFailed);
        }
        Err(_) => {
            log::warn!(
                "fetching {} took longer than {:?}",
                query,
                config.fetch_timeout()
            );
            return (CourseRecord::empty(), Outcome::UpstreamFailed);
        }
    };

    let record = extract_course(&html);
    if record.is_complete() {
        (record.clone(), Outcome::Found(record))
    } else {
        log::info!("no complete infobox for {}", query);
        (record.clone(), Outcome::NotFound(record))
    }
}
