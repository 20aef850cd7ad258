// SPDX-License-Identifier: MIT
//! Bot registry — exactly one chat bot per distinct token.
//!
//! New bots are announced over a channel so the command dispatcher can start
//! one listener per bot as hot-reload discovers tokens. During graceful
//! shutdown the registry is flagged and refuses further construction, so no
//! worker can spawn a bot while the rest are being torn down.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::warn;

use crate::bot::{BotError, ChatTransport, TelegramTransport};

struct BotState {
    chat_ids: HashSet<i64>,
    priority: bool,
}

/// One bot instance plus the subscription state the registry tracks for it.
/// Only chat ids and a priority flag live here — user records are looked up
/// by id at send time, which keeps ownership acyclic.
pub struct RegisteredBot {
    transport: Arc<dyn ChatTransport>,
    state: RwLock<BotState>,
}

impl RegisteredBot {
    fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: RwLock::new(BotState {
                chat_ids: HashSet::new(),
                priority: false,
            }),
        }
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        self.transport.clone()
    }

    pub fn add_chat_id(&self, chat_id: i64) {
        self.state
            .write()
            .expect("bot lock poisoned")
            .chat_ids
            .insert(chat_id);
    }

    pub fn chat_ids(&self) -> Vec<i64> {
        self.state
            .read()
            .expect("bot lock poisoned")
            .chat_ids
            .iter()
            .copied()
            .collect()
    }

    /// Flag this bot as serving at least one root user.
    pub fn mark_priority(&self) {
        self.state.write().expect("bot lock poisoned").priority = true;
    }

    pub fn is_priority(&self) -> bool {
        self.state.read().expect("bot lock poisoned").priority
    }
}

type TransportFactory = Box<dyn Fn(&str) -> Result<Arc<dyn ChatTransport>, BotError> + Send + Sync>;

struct BotsIndex {
    by_token: HashMap<String, Arc<RegisteredBot>>,
    shutting_down: bool,
}

pub struct BotRegistry {
    inner: RwLock<BotsIndex>,
    factory: TransportFactory,
    announce: mpsc::UnboundedSender<Arc<RegisteredBot>>,
}

impl BotRegistry {
    /// Registry with the production Telegram transport. The returned
    /// receiver yields each newly constructed bot exactly once.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Arc<RegisteredBot>>) {
        Self::with_factory(Box::new(|token| {
            Ok(Arc::new(TelegramTransport::new(token)?) as Arc<dyn ChatTransport>)
        }))
    }

    /// Registry with a custom transport constructor. Tests inject fakes.
    pub fn with_factory(
        factory: TransportFactory,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<RegisteredBot>>) {
        let (announce, announced) = mpsc::unbounded_channel();
        (
            Self {
                inner: RwLock::new(BotsIndex {
                    by_token: HashMap::new(),
                    shutting_down: false,
                }),
                factory,
                announce,
            },
            announced,
        )
    }

    /// Return the bot for `token`, constructing it under the write lock
    /// (double-checked) on first use.
    pub fn get_or_create(&self, token: &str) -> Result<Arc<RegisteredBot>, BotError> {
        assert!(!token.is_empty(), "empty bot token");

        {
            let inner = self.inner.read().expect("bot registry lock poisoned");
            if inner.shutting_down {
                return Err(BotError::ShuttingDown);
            }
            if let Some(bot) = inner.by_token.get(token) {
                return Ok(bot.clone());
            }
        }

        let mut inner = self.inner.write().expect("bot registry lock poisoned");
        if inner.shutting_down {
            return Err(BotError::ShuttingDown);
        }
        // Double check — another caller may have won the race.
        if let Some(bot) = inner.by_token.get(token) {
            return Ok(bot.clone());
        }

        let transport = (self.factory)(token)?;
        let bot = Arc::new(RegisteredBot::new(transport));
        inner.by_token.insert(token.to_string(), bot.clone());
        if self.announce.send(bot.clone()).is_err() {
            warn!("bot announce channel closed — dispatcher will not see new bot");
        }
        Ok(bot)
    }

    pub fn all(&self) -> Vec<Arc<RegisteredBot>> {
        self.inner
            .read()
            .expect("bot registry lock poisoned")
            .by_token
            .values()
            .cloned()
            .collect()
    }

    /// Refuse any further `get_or_create`; set during graceful shutdown.
    pub fn set_shutting_down(&self) {
        self.inner
            .write()
            .expect("bot registry lock poisoned")
            .shutting_down = true;
    }
}
