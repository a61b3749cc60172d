//! The mDNS message layer: query/answer send, listener loop, max-packet
//! policy, event dispatch, async resolve (spec.md §4.5).
//!
//! Grounded on the teacher's split between wire codec and I/O: `dns.rs`
//! does not know about sockets, and neither does this module's encode
//! path — `MulticastService` only calls `Message::to_vec`/`truncate`
//! (C1) and `Transport::send` (C4), gluing them together the way spec.md
//! §2's data-flow diagram describes C4 <-> C5 <-> C1.

use crate::cfg::{Config, MAX_DATAGRAM, RECENT_MESSAGE_WINDOW};
use crate::errors::Error;
use crate::events::Event;
use crate::name::Name;
use crate::nic;
use crate::recent::RecentMessages;
use crate::transport::Transport;
use crate::types::{Class, Message, Opcode, Question, Rcode, Type, QR};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;

struct Shared {
    config: Config,
    events_tx: broadcast::Sender<Event>,
    recent: RecentMessages,
    transport: RwLock<Option<Arc<Transport>>>,
}

/// The mDNS transport-and-dispatch service (spec.md §4.5). Cheaply
/// `Clone`-able; clones share the same sockets and subscriber list.
#[derive(Clone)]
pub struct MulticastService {
    shared: Arc<Shared>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MulticastService {
    pub fn new(config: Config) -> MulticastService {
        let (events_tx, _) = broadcast::channel(256);
        MulticastService {
            shared: Arc::new(Shared {
                config,
                events_tx,
                recent: RecentMessages::new(RECENT_MESSAGE_WINDOW),
                transport: RwLock::new(None),
            }),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.events_tx.subscribe()
    }

    pub(crate) fn raise(&self, event: Event) {
        let _ = self.shared.events_tx.send(event);
    }

    /// Starts the transport and listener tasks (spec.md §4.5). Idempotent:
    /// calling `start` again while already started is a no-op.
    pub async fn start(&self) -> Result<(), Error> {
        if self.shared.transport.read().await.is_some() {
            return Ok(());
        }

        let (nic_tx, mut nic_rx) = mpsc::unbounded_channel();
        let nic_task = tokio::spawn(nic::run(self.shared.config.clone(), nic_tx));

        let first_diff = nic_rx.recv().await.ok_or(Error::StartupError)?;
        let transport = Arc::new(Transport::start(&self.shared.config, &first_diff.added).await?);

        let mut receiver_tasks = self.spawn_receivers(transport.clone());
        *self.shared.transport.write().await = Some(transport);

        let shared = self.shared.clone();
        let rebuild_task = tokio::spawn(async move {
            while let Some(diff) = nic_rx.recv().await {
                let added = diff.added.iter().map(|a| a.addr.to_string()).collect();
                let _ = shared
                    .events_tx
                    .send(Event::NetworkInterfaceDiscovered { added });
            }
        });

        let mut tasks = self.tasks.lock().await;
        tasks.push(nic_task);
        tasks.push(rebuild_task);
        tasks.append(&mut receiver_tasks);

        Ok(())
    }

    /// Cancels every task spawned by `start` and drops the transport
    /// (spec.md §4.5, §5: "all in-flight sends are either completed or
    /// abandoned with logs").
    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
        *self.shared.transport.write().await = None;
    }

    fn spawn_receivers(&self, transport: Arc<Transport>) -> Vec<JoinHandle<()>> {
        transport
            .sockets
            .iter()
            .map(|nic_socket| {
                let socket = nic_socket.socket.clone();
                let local = nic_socket.local_addr;
                let shared = self.shared.clone();
                let transport = transport.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; MAX_DATAGRAM];
                    loop {
                        let (len, remote) = match socket.recv_from(&mut buf).await {
                            Ok(v) => v,
                            Err(e) => {
                                log::warn!("mdns receive failed: {}", e);
                                continue;
                            }
                        };

                        if !transport.accept(remote) {
                            continue;
                        }

                        dispatch(&shared, &buf[..len], local, remote);
                    }
                })
            })
            .collect()
    }

    async fn transport(&self) -> Result<Arc<Transport>, Error> {
        self.shared
            .transport
            .read()
            .await
            .clone()
            .ok_or(Error::NotStarted)
    }

    /// `send_query(name, class=IN, type=ANY)` (spec.md §4.5).
    pub async fn send_query(&self, name: Name, r#type: Type, class: Class) -> Result<(), Error> {
        let mut message = Message::new_query();
        message.questions.push(Question::new(name, r#type, class));
        self.send_query_message(&message).await
    }

    /// `send_query(message)` (spec.md §4.5): serializes, enforces
    /// `max_packet`, transmits. Never deduped.
    pub async fn send_query_message(&self, message: &Message) -> Result<(), Error> {
        self.send_query_inner(message.clone(), false).await
    }

    /// Like `send_query` but sets the QU bit on every question (spec.md
    /// §4.5 `send_unicast_query`).
    pub async fn send_unicast_query(&self, message: &Message) -> Result<(), Error> {
        self.send_query_inner(message.clone(), true).await
    }

    async fn send_query_inner(&self, mut message: Message, qu: bool) -> Result<(), Error> {
        if qu {
            for question in &mut message.questions {
                question.unicast_response = true;
            }
        }

        let transport = self.transport().await?;
        let bytes = message.to_vec()?;
        if bytes.len() > transport.max_packet {
            return Err(Error::PacketTooLarge {
                len: bytes.len(),
                max: transport.max_packet,
            });
        }
        transport.send(&bytes).await;
        Ok(())
    }

    /// `send_answer(message, check_duplicate)` (spec.md §4.5): forces
    /// `AA=1, ID=0`, empties the question list, truncates to
    /// `max_packet`, and suppresses the send if `check_duplicate` and an
    /// identical datagram was sent within the recent-message window.
    pub async fn send_answer(&self, mut message: Message, check_duplicate: bool) -> Result<(), Error> {
        message.qr = QR::Response;
        message.aa = true;
        message.id = 0;
        message.questions.clear();

        let transport = self.transport().await?;
        let bytes = message.truncate(transport.max_packet)?;

        let is_new = self.shared.recent.try_add(&bytes);
        if check_duplicate && !is_new {
            return Ok(());
        }

        transport.send(&bytes).await;
        Ok(())
    }

    /// Sends `bytes` to a single endpoint (used for QU responses, spec.md
    /// §4.7 query handler "if QU, unicast the response").
    pub async fn send_unicast_answer(
        &self,
        mut message: Message,
        to: std::net::SocketAddr,
    ) -> Result<(), Error> {
        message.qr = QR::Response;
        message.aa = true;
        message.id = 0;
        message.questions.clear();

        let transport = self.transport().await?;
        let bytes = message.truncate(transport.max_packet)?;
        transport.send_unicast(&bytes, to).await;
        Ok(())
    }

    /// Resolves to the first received answer containing at least one RR
    /// whose name matches every question in `query` (spec.md §4.5
    /// `resolve_async`). `cancel` firing at any point yields
    /// `Error::Cancelled`; the event subscription is always dropped on
    /// return.
    pub async fn resolve_async(
        &self,
        query: Message,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<Message, Error> {
        let mut rx = self.subscribe();
        self.send_query_message(&query).await?;

        loop {
            tokio::select! {
                _ = &mut cancel => return Err(Error::Cancelled),
                event = rx.recv() => match event {
                    Ok(Event::AnswerReceived { message, .. }) => {
                        if matches_all_questions(&query, &message) {
                            return Ok((*message).clone());
                        }
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Err(Error::Cancelled),
                },
            }
        }
    }
}

fn matches_all_questions(query: &Message, answer: &Message) -> bool {
    !query.questions.is_empty()
        && query
            .questions
            .iter()
            .all(|q| answer.answers.iter().any(|rr| rr.name == q.name))
}

/// Parses an inbound datagram and raises the corresponding event (spec.md
/// §4.5 "Dispatch"). Opcode/rcode checks and event selection live here so
/// every receiver task shares identical behavior.
fn dispatch(shared: &Shared, bytes: &[u8], local: std::net::SocketAddr, remote: std::net::SocketAddr) {
    let message = match Message::from_slice(bytes) {
        Ok(m) => m,
        Err(e) => {
            log::debug!(
                "malformed message from {}: {}\n{}",
                remote,
                e,
                crate::util::hexdump(bytes)
            );
            let _ = shared.events_tx.send(Event::MalformedMessage {
                bytes: bytes.to_vec(),
            });
            return;
        }
    };

    if message.opcode != Opcode::Query || message.rcode != Rcode::NoError {
        return;
    }

    let message = Arc::new(message);
    if message.is_query() && !message.questions.is_empty() {
        let _ = shared.events_tx.send(Event::QueryReceived {
            message,
            local_addr: local,
            remote_addr: remote,
        });
    } else if message.is_response() && !message.answers.is_empty() {
        let _ = shared.events_tx.send(Event::AnswerReceived {
            message,
            local_addr: local,
            remote_addr: remote,
        });
    }
}

