// Router drives handlers over real sockets: one task per connection,
// each with its own handler clone. Prices go out on the mpsc channel.

use std::time::Duration;

use anyhow::{bail, Context};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::WebSocketConfig;
use crate::market_data::adapters::WebSocketDataHandler;
use crate::market_data::types::{CurrencyPair, PriceResponse, WireMessage};

/// Run until `tx`'s receiver is dropped.
pub async fn run(
    handler: Box<dyn WebSocketDataHandler>,
    websocket: WebSocketConfig,
    tickers: Vec<CurrencyPair>,
    tx: mpsc::Sender<PriceResponse>,
) -> anyhow::Result<()> {
    let groups = split_tickers(&tickers, websocket.max_subscriptions_per_connection);
    info!(
        venue = handler.name(),
        tickers = tickers.len(),
        connections = groups.len(),
        "starting router"
    );

    let mut tasks = JoinSet::new();
    for (id, group) in groups.into_iter().enumerate() {
        let span = info_span!("connection", venue = handler.name(), id);
        let conn = Connection {
            venue: handler.name().to_string(),
            handler: handler.clone(),
            websocket: websocket.clone(),
            tickers: group,
            tx: tx.clone(),
        };
        tasks.spawn(conn.run().instrument(span));
    }
    drop(tx);

    while let Some(joined) = tasks.join_next().await {
        joined.context("connection task panicked")?;
    }
    Ok(())
}

// 0 = everything on one connection
fn split_tickers(tickers: &[CurrencyPair], per_connection: usize) -> Vec<Vec<CurrencyPair>> {
    if tickers.is_empty() {
        return Vec::new();
    }
    if per_connection == 0 {
        return vec![tickers.to_vec()];
    }
    tickers.chunks(per_connection).map(<[_]>::to_vec).collect()
}

enum SessionEnd {
    Closed,
    ReceiverGone,
}

struct Connection {
    venue: String,
    handler: Box<dyn WebSocketDataHandler>,
    websocket: WebSocketConfig,
    tickers: Vec<CurrencyPair>,
    tx: mpsc::Sender<PriceResponse>,
}

impl Connection {
    async fn run(self) {
        let backoff = self.backoff();
        loop {
            match self.session().await {
                Ok(SessionEnd::ReceiverGone) => return,
                Ok(SessionEnd::Closed) => info!("connection closed by venue"),
                Err(err) => warn!(error = %err, "connection failed"),
            }
            if self.tx.is_closed() {
                return;
            }
            metrics::counter!("gatefeed_reconnects_total", "venue" => self.venue.clone()).increment(1);
            time::sleep(backoff).await;
        }
    }

    async fn session(&self) -> anyhow::Result<SessionEnd> {
        let read_timeout = Duration::from_millis(self.websocket.read_timeout_ms);
        let (stream, _) = time::timeout(read_timeout, tokio_tungstenite::connect_async(self.websocket.url.as_str()))
            .await
            .context("connect timed out")??;
        info!(url = %self.websocket.url, tickers = self.tickers.len(), "connected");
        let (mut write, mut read) = stream.split();

        for msg in self.handler.build_subscriptions(&self.tickers)? {
            self.send(&mut write, msg).await?;
        }

        let mut heartbeat = (self.websocket.ping_interval_ms > 0).then(|| {
            let mut interval = time::interval(Duration::from_millis(self.websocket.ping_interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut consecutive_errors = 0u32;

        loop {
            tokio::select! {
                _ = tick(&mut heartbeat) => {
                    for msg in self.handler.heartbeat_messages()? {
                        self.send(&mut write, msg).await?;
                    }
                }
                next = time::timeout(read_timeout, read.next()) => {
                    let frame = match next {
                        Err(_) => bail!("no frame within {read_timeout:?}"),
                        Ok(None) => return Ok(SessionEnd::Closed),
                        Ok(Some(frame)) => frame?,
                    };
                    let bytes = match frame {
                        Message::Text(text) => text.into_bytes(),
                        Message::Binary(bytes) => bytes,
                        Message::Close(_) => return Ok(SessionEnd::Closed),
                        _ => continue, // pongs are queued by tungstenite itself
                    };
                    metrics::counter!("gatefeed_frames_total", "venue" => self.venue.clone()).increment(1);

                    match self.handler.handle_message(&bytes) {
                        Ok(outcome) => {
                            consecutive_errors = 0;
                            if !outcome.outbound.is_empty() {
                                // handler-driven retries are paced like reconnects
                                debug!(frames = outcome.outbound.len(), "delaying handler outbound frames");
                                time::sleep(self.backoff()).await;
                            }
                            for msg in outcome.outbound {
                                self.send(&mut write, msg).await?;
                            }
                            if let Some(response) = outcome.response {
                                metrics::counter!("gatefeed_prices_total", "venue" => self.venue.clone())
                                    .increment(response.resolved.len() as u64);
                                if self.tx.send(response).await.is_err() {
                                    return Ok(SessionEnd::ReceiverGone);
                                }
                            }
                        }
                        Err(err) => {
                            metrics::counter!("gatefeed_handler_errors_total", "venue" => self.venue.clone()).increment(1);
                            if !err.is_frame_error() {
                                return Err(err.into());
                            }
                            consecutive_errors += 1;
                            warn!(error = %err, consecutive_errors, "failed to handle frame");
                            if consecutive_errors >= self.websocket.max_read_error_count {
                                bail!("{consecutive_errors} consecutive handler errors");
                            }
                        }
                    }
                }
            }
        }
    }

    fn backoff(&self) -> Duration {
        Duration::from_millis(self.websocket.reconnection_timeout_ms)
    }

    async fn send<S>(&self, write: &mut S, msg: WireMessage) -> anyhow::Result<()>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let write_timeout = Duration::from_millis(self.websocket.write_timeout_ms);
        debug!(frame = msg.as_str(), "sending");
        time::timeout(write_timeout, write.send(Message::Text(msg.into_text())))
            .await
            .context("write timed out")??;
        Ok(())
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
