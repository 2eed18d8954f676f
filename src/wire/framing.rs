//! Message framing on the private query link.
//!
//! Every connection carries exactly one request and one response. With
//! [`Framing::Raw`] the bytes on the wire are the bare message: the sender
//! writes it and half-closes, the receiver reads until EOF. A peer that never
//! half-closes is still served: once some bytes have arrived, a pause of
//! [`ReadLimits::idle`] ends the message. [`Framing::LengthDelimited`]
//! prefixes each message with a 4-byte big-endian length instead.

use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout};
use tokio_util::codec::{
    FramedRead, FramedWrite, LengthDelimitedCodec, LengthDelimitedCodecError,
};

use crate::error::cinwiki::FrameError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    #[default]
    Raw,
    LengthDelimited,
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Framing::Raw),
            "length-delimited" | "length_delimited" => Ok(Framing::LengthDelimited),
            other => Err(format!(
                "unknown framing {other:?}, expected \"raw\" or \"length-delimited\""
            )),
        }
    }
}

/// Bounds on reading one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub max: usize,
    /// Wait for the whole message, and for the first byte in raw mode.
    pub deadline: Duration,
    /// Raw mode only: silence after the first byte that ends the message.
    pub idle: Duration,
}

/// Reads one message within `limits`.
pub async fn read_message<S>(
    stream: &mut S,
    framing: Framing,
    limits: ReadLimits,
) -> Result<Vec<u8>, FrameError>
where
    S: AsyncRead + Unpin,
{
    match framing {
        Framing::Raw => read_raw(stream, limits).await,
        Framing::LengthDelimited => read_length_delimited(stream, limits).await,
    }
}

/// Writes one message and half-closes the write side.
pub async fn write_message<S>(
    stream: &mut S,
    framing: Framing,
    message: &[u8],
    deadline: Duration,
) -> Result<(), FrameError>
where
    S: AsyncWrite + Unpin,
{
    let write = async {
        match framing {
            Framing::Raw => stream.write_all(message).await?,
            Framing::LengthDelimited => {
                let mut framed = FramedWrite::new(&mut *stream, LengthDelimitedCodec::new());
                framed.send(Bytes::copy_from_slice(message)).await?;
            }
        }
        stream.shutdown().await?;
        Ok::<_, std::io::Error>(())
    };

    timeout(deadline, write)
        .await
        .map_err(|_| FrameError::Timeout(deadline))??;
    Ok(())
}

async fn read_raw<S>(stream: &mut S, limits: ReadLimits) -> Result<Vec<u8>, FrameError>
where
    S: AsyncRead + Unpin,
{
    let ReadLimits { max, deadline, idle } = limits;
    // Relative waits only: `Instant + Duration` would overflow on huge deadlines.
    let started = Instant::now();
    let mut message = Vec::new();
    let mut chunk = vec![0u8; max.saturating_add(1).min(8192)];

    loop {
        let remaining = deadline.saturating_sub(started.elapsed());
        let wait = if message.is_empty() {
            remaining
        } else {
            idle.min(remaining)
        };
        // One byte of slack past `max` tells an oversized message from an exact fit.
        let room = max
            .saturating_add(1)
            .saturating_sub(message.len())
            .min(chunk.len());

        let read = match timeout(wait, stream.read(&mut chunk[..room])).await {
            Ok(read) => read?,
            Err(_) if message.is_empty() => return Err(FrameError::Timeout(deadline)),
            Err(_) => {
                log::debug!("peer went quiet, taking {} bytes", message.len());
                break;
            }
        };
        if read == 0 {
            break;
        }
        message.extend_from_slice(&chunk[..read]);
        if message.len() > max {
            return Err(FrameError::TooLarge { limit: max });
        }
    }

    if message.is_empty() {
        return Err(FrameError::Closed);
    }
    Ok(message)
}

async fn read_length_delimited<S>(
    stream: &mut S,
    limits: ReadLimits,
) -> Result<Vec<u8>, FrameError>
where
    S: AsyncRead + Unpin,
{
    let ReadLimits { max, deadline, .. } = limits;
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max)
        .new_codec();
    let mut framed = FramedRead::new(stream, codec);

    match timeout(deadline, framed.next()).await {
        Err(_) => Err(FrameError::Timeout(deadline)),
        Ok(None) => Err(FrameError::Closed),
        Ok(Some(Ok(frame))) => Ok(frame.to_vec()),
        Ok(Some(Err(err))) => {
            let too_large = err
                .get_ref()
                .is_some_and(|inner| inner.is::<LengthDelimitedCodecError>());
            if too_large {
                Err(FrameError::TooLarge { limit: max })
            } else {
                Err(FrameError::Io(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    const WAIT: Duration = Duration::from_secs(2);

    fn limits(max: usize, deadline: Duration) -> ReadLimits {
        ReadLimits {
            max,
            deadline,
            idle: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn raw_message_passes_through_unchanged() {
        let (mut a, mut b) = duplex(64);
        write_message(&mut a, Framing::Raw, b"IF684", WAIT).await.unwrap();
        let got = read_message(&mut b, Framing::Raw, limits(64, WAIT)).await.unwrap();
        assert_eq!(got, b"IF684");
    }

    #[tokio::test]
    async fn raw_message_spanning_several_reads_is_reassembled() {
        let (mut a, mut b) = duplex(4);
        let writer = tokio::spawn(async move {
            write_message(&mut a, Framing::Raw, b"Compiladores - Fernando Castor", WAIT)
                .await
                .unwrap();
        });
        let got = read_message(&mut b, Framing::Raw, limits(1024, WAIT)).await.unwrap();
        writer.await.unwrap();
        assert_eq!(got, b"Compiladores - Fernando Castor");
    }

    #[tokio::test]
    async fn raw_reader_ends_message_after_idle_gap() {
        let (mut a, mut b) = duplex(64);
        a.write_all(b"IF684").await.unwrap();
        // `a` stays open: the peer never half-closes.
        let started = Instant::now();
        let got = read_message(&mut b, Framing::Raw, limits(64, Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(got, b"IF684");
        assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
        drop(a);
    }

    #[tokio::test]
    async fn raw_reader_waits_full_deadline_for_first_byte() {
        let (mut a, mut b) = duplex(64);
        let writer = tokio::spawn(async move {
            // Longer than the idle gap, shorter than the deadline.
            tokio::time::sleep(Duration::from_millis(200)).await;
            a.write_all(b"IF684").await.unwrap();
            a.shutdown().await.unwrap();
        });
        let got = read_message(&mut b, Framing::Raw, limits(64, WAIT)).await.unwrap();
        writer.await.unwrap();
        assert_eq!(got, b"IF684");
    }

    #[tokio::test]
    async fn raw_reader_times_out_on_silence() {
        let (_a, mut b) = duplex(64);
        let err = read_message(&mut b, Framing::Raw, limits(64, Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
    }

    #[tokio::test]
    async fn huge_deadlines_do_not_overflow() {
        let (mut a, mut b) = duplex(64);
        write_message(&mut a, Framing::Raw, b"IF684", Duration::MAX).await.unwrap();
        let got = read_message(
            &mut b,
            Framing::Raw,
            ReadLimits {
                max: 64,
                deadline: Duration::MAX,
                idle: Duration::MAX,
            },
        )
        .await
        .unwrap();
        assert_eq!(got, b"IF684");
    }

    #[tokio::test]
    async fn raw_reader_rejects_oversized_message() {
        let (mut a, mut b) = duplex(64);
        write_message(&mut a, Framing::Raw, b"0123456789", WAIT).await.unwrap();
        let err = read_message(&mut b, Framing::Raw, limits(8, WAIT)).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { limit: 8 }));
    }

    #[tokio::test]
    async fn raw_reader_reports_closed_on_empty_stream() {
        let (a, mut b) = duplex(64);
        drop(a);
        let err = read_message(&mut b, Framing::Raw, limits(64, WAIT)).await.unwrap_err();
        assert!(matches!(err, FrameError::Closed));
    }

    #[tokio::test]
    async fn length_delimited_message_passes_through() {
        let (mut a, mut b) = duplex(64);
        write_message(&mut a, Framing::LengthDelimited, b" - ", WAIT)
            .await
            .unwrap();
        let got = read_message(&mut b, Framing::LengthDelimited, limits(64, WAIT))
            .await
            .unwrap();
        assert_eq!(got, b" - ");
    }

    #[tokio::test]
    async fn length_delimited_reader_enforces_limit() {
        let (mut a, mut b) = duplex(64);
        write_message(&mut a, Framing::LengthDelimited, b"0123456789", WAIT)
            .await
            .unwrap();
        let err = read_message(&mut b, Framing::LengthDelimited, limits(4, WAIT))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { limit: 4 }));
    }

    #[test]
    fn framing_parses_from_text() {
        assert_eq!("raw".parse::<Framing>().unwrap(), Framing::Raw);
        assert_eq!(
            "Length-Delimited".parse::<Framing>().unwrap(),
            Framing::LengthDelimited
        );
        assert!("json".parse::<Framing>().is_err());
    }
}
