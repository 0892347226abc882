/*
 * nip13.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Rondine, a cross-platform Nostr client library.
 *
 * Rondine is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Rondine is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Rondine.  If not, see <http://www.gnu.org/licenses/>.
 */

//! NIP-13 proof of work: search for a `["nonce", n, difficulty]` tag
//! such that the event id has at least `difficulty` leading zero bits.
//! The search runs in batches, yielding to the runtime and checking
//! cancellation between batches. Mining happens before signing; the
//! signature then covers the mined id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, MiningError};
use crate::event::Event;

/// Leading zero bits of a hex-encoded id, counted per nibble: a zero
/// hex digit contributes 4 bits, the first nonzero digit contributes
/// its own leading zeros and ends the count.
pub fn pow_difficulty(id_hex: &str) -> u32 {
    let mut bits = 0;
    for c in id_hex.chars() {
        let Some(nibble) = c.to_digit(16) else { break };
        if nibble == 0 {
            bits += 4;
        } else {
            bits += nibble.leading_zeros() - 28;
            break;
        }
    }
    bits
}

/// Periodic progress report from the miner.
#[derive(Debug, Clone, Copy)]
pub struct MinerProgress {
    pub nonce: u64,
    pub hashes_per_second: f64,
}

/// Miner configuration. `cancel` is checked at every batch boundary;
/// flip it from another task to abort the search.
pub struct MinerOptions {
    pub batch_size: u64,
    pub timeout: Option<Duration>,
    pub start_nonce: u64,
    pub max_nonce: u64,
    pub cancel: Option<Arc<AtomicBool>>,
    pub progress: Option<Box<dyn Fn(MinerProgress) + Send>>,
}

impl Default for MinerOptions {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            timeout: None,
            start_nonce: 0,
            max_nonce: u64::MAX,
            cancel: None,
            progress: None,
        }
    }
}

/// Mine `event` to at least `difficulty` leading zero bits. Existing
/// `nonce` tags are stripped; the winning tag is appended as
/// `["nonce", "<n>", "<difficulty>"]` and survives signing unchanged.
pub async fn mine_event(
    event: &Event,
    difficulty: u32,
    options: MinerOptions,
) -> Result<Event, Error> {
    if difficulty > 256 {
        return Err(Error::Validation(format!(
            "difficulty {} out of range 0..256",
            difficulty
        )));
    }
    if event.is_signed() {
        return Err(Error::Validation(String::from(
            "mining must happen before signing",
        )));
    }

    let timeout = options.timeout;
    let search = search_nonce(event.clone(), difficulty, options);
    match timeout {
        Some(deadline) => {
            tokio::select! {
                result = search => result,
                _ = tokio::time::sleep(deadline) => Err(Error::Mining(MiningError::Timeout)),
            }
        }
        None => search.await,
    }
}

async fn search_nonce(
    mut event: Event,
    difficulty: u32,
    options: MinerOptions,
) -> Result<Event, Error> {
    event.tags.retain(|t| t.first().map(String::as_str) != Some("nonce"));
    event.tags.push(vec![
        String::from("nonce"),
        String::new(),
        difficulty.to_string(),
    ]);
    let nonce_tag = event.tags.len() - 1;

    let mut nonce = options.start_nonce;
    loop {
        let batch_started = Instant::now();
        let batch_end = nonce.saturating_add(options.batch_size);
        while nonce < batch_end {
            if nonce > options.max_nonce {
                return Err(Error::Mining(MiningError::NonceExhausted));
            }
            event.tags[nonce_tag][1] = nonce.to_string();
            let id = event.compute_id();
            if pow_difficulty(&id) >= difficulty {
                event.id = id;
                return Ok(event);
            }
            nonce += 1;
        }

        if let Some(ref cancel) = options.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Mining(MiningError::Cancelled));
            }
        }
        if let Some(ref progress) = options.progress {
            let elapsed = batch_started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                options.batch_size as f64 / elapsed
            } else {
                0.0
            };
            progress(MinerProgress {
                nonce,
                hashes_per_second: rate,
            });
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EventBuilder;
    use crate::keys::KeyPair;
    use std::sync::Mutex;

    fn unsigned_note(keys: &KeyPair) -> Event {
        EventBuilder::text_note("pow me")
            .created_at(1_700_000_000)
            .build_unsigned(keys.public_key_hex())
            .unwrap()
    }

    #[test]
    fn difficulty_counts_per_nibble() {
        assert_eq!(pow_difficulty(&format!("{:0<64}", "f")), 0);
        assert_eq!(pow_difficulty(&format!("{:0<64}", "8")), 0);
        assert_eq!(pow_difficulty(&format!("{:0<64}", "7")), 1);
        assert_eq!(pow_difficulty(&format!("{:0<64}", "1")), 3);
        assert_eq!(pow_difficulty(&format!("0{:0<63}", "f")), 4);
        assert_eq!(pow_difficulty(&format!("00{:0<62}", "2")), 10);
        assert_eq!(pow_difficulty(&"0".repeat(64)), 256);
    }

    #[tokio::test]
    async fn mines_to_difficulty_8_and_signs() {
        let keys = KeyPair::generate().unwrap();
        let event = unsigned_note(&keys);
        let mut mined = mine_event(&event, 8, MinerOptions::default()).await.unwrap();

        assert!(mined.id.starts_with("00"));
        assert!(pow_difficulty(&mined.id) >= 8);
        let nonce_tag = mined.tags.last().unwrap();
        assert_eq!(nonce_tag[0], "nonce");
        assert_eq!(nonce_tag[2], "8");

        // Signing recomputes the same id from the mined tag set.
        keys.sign_event(&mut mined).unwrap();
        assert!(pow_difficulty(&mined.id) >= 8);
        assert_eq!(mined.tags.last().unwrap()[0], "nonce");
        mined.verify().unwrap();
    }

    #[tokio::test]
    async fn strips_stale_nonce_tags() {
        let keys = KeyPair::generate().unwrap();
        let mut event = unsigned_note(&keys);
        event.tags.push(vec![
            String::from("nonce"),
            String::from("999"),
            String::from("4"),
        ]);
        let mined = mine_event(&event, 4, MinerOptions::default()).await.unwrap();
        let nonce_tags: Vec<_> = mined.tags_named("nonce");
        assert_eq!(nonce_tags.len(), 1);
        assert_eq!(nonce_tags[0][2], "4");
    }

    #[tokio::test]
    async fn cancellation_is_observed() {
        let keys = KeyPair::generate().unwrap();
        let event = unsigned_note(&keys);
        let cancel = Arc::new(AtomicBool::new(true));
        let options = MinerOptions {
            batch_size: 10,
            cancel: Some(cancel),
            ..Default::default()
        };
        // difficulty 255 cannot be hit within one 10-hash batch
        let result = mine_event(&event, 255, options).await;
        assert!(matches!(result, Err(Error::Mining(MiningError::Cancelled))));
    }

    #[tokio::test]
    async fn timeout_wins_the_race() {
        let keys = KeyPair::generate().unwrap();
        let event = unsigned_note(&keys);
        let options = MinerOptions {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let result = mine_event(&event, 255, options).await;
        assert!(matches!(result, Err(Error::Mining(MiningError::Timeout))));
    }

    #[tokio::test]
    async fn nonce_space_exhaustion() {
        let keys = KeyPair::generate().unwrap();
        let event = unsigned_note(&keys);
        let options = MinerOptions {
            batch_size: 64,
            max_nonce: 32,
            ..Default::default()
        };
        let result = mine_event(&event, 255, options).await;
        assert!(matches!(
            result,
            Err(Error::Mining(MiningError::NonceExhausted))
        ));
    }

    #[tokio::test]
    async fn progress_reports_flow() {
        let keys = KeyPair::generate().unwrap();
        let event = unsigned_note(&keys);
        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cancel = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&cancel);
        let options = MinerOptions {
            batch_size: 16,
            cancel: Some(cancel),
            progress: Some(Box::new(move |p: MinerProgress| {
                sink.lock().unwrap().push(p.nonce);
                if p.nonce >= 64 {
                    stop.store(true, Ordering::Relaxed);
                }
            })),
            ..Default::default()
        };
        let _ = mine_event(&event, 255, options).await;
        let reports = seen.lock().unwrap();
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn signed_event_rejected() {
        let keys = KeyPair::generate().unwrap();
        let event = EventBuilder::text_note("x").sign(&keys).unwrap();
        assert!(mine_event(&event, 1, MinerOptions::default()).await.is_err());
    }
}
