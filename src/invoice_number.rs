use std::collections::HashSet;

use chrono::{DateTime, Datelike, Local};
use log::{debug, warn};
#[cfg(test)]
use mockall::automock;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// 乱数部分の上限(両端を含む)。
const MAX_SUFFIX: u32 = 99_999;
/// 衝突時に引き直す最大回数。
const MAX_ATTEMPTS: usize = 20;

/// 請求書番号の乱数部分を供給するためのtrait。
#[cfg_attr(test, automock)]
pub trait RandomSource {
    /// `0..=max`の一様乱数を返す。
    fn draw(&mut self, max: u32) -> u32;
}

/// OSの暗号論的乱数を優先し、利用できない場合はスレッドローカルの擬似乱数を使う。
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn draw(&mut self, max: u32) -> u32 {
        let mut buffer = [0u8; 4];
        match OsRng.try_fill_bytes(&mut buffer) {
            Ok(()) => u32::from_le_bytes(buffer) % (max + 1),
            Err(e) => {
                debug!("OS random source unavailable, falling back: {}", e);
                rand::thread_rng().gen_range(0..=max)
            }
        }
    }
}

/// 生成時点の年月による請求書番号の接頭辞。
pub fn invoice_prefix(now: DateTime<Local>) -> String {
    format!("INV-{}{:02}-", now.year(), now.month())
}

/// 発行済みの番号と重ならない請求書番号を作る。
///
/// 同じ接頭辞を持つ発行済み番号とのみ衝突判定を行う。
/// 20回続けて衝突した場合はエポックミリ秒の下5桁を使う。この番号は重複しうる。
///
/// # Arguments
///
/// * `existing` - これまでに発行した請求書番号
/// * `now` - 生成時刻(請求日ではない)
/// * `rng` - 乱数の供給元
pub fn next_invoice_number<'a, I, R>(existing: I, now: DateTime<Local>, rng: &mut R) -> String
where
    I: IntoIterator<Item = &'a str>,
    R: RandomSource + ?Sized,
{
    let prefix = invoice_prefix(now);
    let taken: HashSet<&str> = existing
        .into_iter()
        .filter(|number| number.starts_with(&prefix))
        .collect();

    for _ in 0..MAX_ATTEMPTS {
        let candidate = format!("{}{:05}", prefix, rng.draw(MAX_SUFFIX));
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
    }

    warn!(
        "Invoice number retries exhausted for {}, using timestamp suffix",
        prefix
    );
    let millis = now.timestamp_millis().to_string();
    let suffix = &millis[millis.len().saturating_sub(5)..];
    format!("{}{}", prefix, suffix)
}
