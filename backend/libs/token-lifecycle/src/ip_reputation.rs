//! In-process IP reputation: a permanent blocklist plus time-boxed bans

use crate::external::{Clock, IpReputation, SystemClock};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct StaticIpReputation {
    blacklisted: DashSet<String>,
    /// ip -> ban end (ms since epoch)
    temporary: DashMap<String, i64>,
    clock: Arc<dyn Clock>,
}

impl Default for StaticIpReputation {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl StaticIpReputation {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            blacklisted: DashSet::new(),
            temporary: DashMap::new(),
            clock,
        }
    }

    pub fn with_blocklist<I, S>(clock: Arc<dyn Clock>, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reputation = Self::new(clock);
        for ip in ips {
            reputation.block(ip);
        }
        reputation
    }

    pub fn block(&self, ip: impl Into<String>) {
        let ip = ip.into();
        info!(ip = %ip, "IP blacklisted");
        self.blacklisted.insert(ip);
    }

    pub fn block_for(&self, ip: impl Into<String>, duration: Duration) {
        let ip = ip.into();
        let until = self
            .clock
            .now_millis()
            .saturating_add(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        info!(ip = %ip, ban_secs = duration.as_secs(), "IP temporarily blacklisted");
        self.temporary.insert(ip, until);
    }

    pub fn unblock(&self, ip: &str) {
        self.blacklisted.remove(ip);
        self.temporary.remove(ip);
    }

    pub fn blocked_count(&self) -> usize {
        self.blacklisted.len()
    }
}

#[async_trait]
impl IpReputation for StaticIpReputation {
    async fn is_blacklisted(&self, ip: &str) -> bool {
        self.blacklisted.contains(ip)
    }

    async fn is_temporarily_blacklisted(&self, ip: &str) -> bool {
        let now = self.clock.now_millis();
        let active = match self.temporary.get(ip) {
            Some(until) => *until > now,
            None => return false,
        };

        if !active {
            // Lapsed ban
            self.temporary.remove_if(ip, |_, until| *until <= now);
            debug!(ip = %ip, "Temporary IP ban lapsed");
        }
        active
    }
}

/// Parse a comma-separated list, dropping blanks
pub fn parse_ip_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}
