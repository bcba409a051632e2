//! Nickname and avatar generation for freshly registered players.
//!
//! Nicknames are `Adjective + Animal` in PascalCase. Uniqueness is checked through a
//! caller-supplied predicate so the same code runs against the database and in tests.

use rand::seq::SliceRandom;
use rand::Rng;

pub const MAX_NICKNAME_ATTEMPTS: usize = 10;

/// Digits of the millisecond clock appended by the fallback. The longest
/// adjective+animal pair plus this suffix still fits `is_valid_nickname`.
const FALLBACK_SUFFIX_DIGITS: u32 = 5;

const ADJECTIVES: &[&str] = &[
  "Brave", "Clever", "Swift", "Curious", "Sneaky", "Mighty", "Jolly", "Witty", "Lucky", "Fuzzy",
  "Sleepy", "Bold", "Calm", "Daring", "Eager", "Fancy", "Gentle", "Happy", "Keen", "Lively",
  "Merry", "Nimble", "Proud", "Quick", "Quirky", "Shiny", "Silent", "Sunny", "Tiny", "Wild",
];

const ANIMALS: &[&str] = &[
  "Otter", "Falcon", "Panda", "Fox", "Koala", "Tiger", "Penguin", "Dolphin", "Owl", "Badger",
  "Lynx", "Moose", "Raccoon", "Gecko", "Heron", "Walrus", "Yak", "Zebra", "Beaver", "Camel",
  "Hedgehog", "Lemur", "Narwhal", "Octopus", "Puffin", "Quokka", "Sloth", "Turtle", "Wombat", "Llama",
];

/// Emoji the client can render as an avatar.
pub const AVATAR_EMOJI: &[&str] = &[
  "🦦", "🦅", "🐼", "🦊", "🐨", "🐯", "🐧", "🐬", "🦉", "🦡", "🐱", "🐶", "🐸", "🐙", "🦥", "🐢",
];

pub const AVATAR_COLORS: &[&str] = &[
  "#FF8A65", "#FFD54F", "#AED581", "#4DB6AC", "#4FC3F7", "#7986CB", "#BA68C8", "#F06292",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
  pub emoji: String,
  pub color: String,
}

fn candidate<R: Rng + ?Sized>(rng: &mut R) -> String {
  let adj = ADJECTIVES.choose(rng).copied().unwrap_or("Brave");
  let animal = ANIMALS.choose(rng).copied().unwrap_or("Otter");
  format!("{adj}{animal}")
}

/// Draw up to [`MAX_NICKNAME_ATTEMPTS`] candidates; if every one is taken, suffix the last
/// candidate with the low digits of `now_millis`.
pub fn generate_nickname<R, F, E>(rng: &mut R, mut is_taken: F, now_millis: i64) -> Result<String, E>
where
  R: Rng + ?Sized,
  F: FnMut(&str) -> Result<bool, E>,
{
  let mut last = String::new();
  for _ in 0..MAX_NICKNAME_ATTEMPTS {
    last = candidate(rng);
    if !is_taken(&last)? {
      return Ok(last);
    }
  }
  let suffix = now_millis.rem_euclid(10i64.pow(FALLBACK_SUFFIX_DIGITS));
  Ok(format!("{last}{suffix:0width$}", width = FALLBACK_SUFFIX_DIGITS as usize))
}

pub fn random_avatar<R: Rng + ?Sized>(rng: &mut R) -> Avatar {
  Avatar {
    emoji: AVATAR_EMOJI.choose(rng).copied().unwrap_or("🦊").to_string(),
    color: AVATAR_COLORS.choose(rng).copied().unwrap_or("#FF8A65").to_string(),
  }
}

/// 3..=20 chars of `[A-Za-z0-9_]`.
pub fn is_valid_nickname(s: &str) -> bool {
  let n = s.chars().count();
  (3..=20).contains(&n) && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_avatar_emoji(s: &str) -> bool {
  AVATAR_EMOJI.contains(&s)
}

/// `#RRGGBB`
pub fn is_hex_color(s: &str) -> bool {
  s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;
  use std::convert::Infallible;

  #[test]
  fn nickname_is_adjective_plus_animal() {
    let mut rng = StdRng::seed_from_u64(7);
    let nick = generate_nickname(&mut rng, |_| Ok::<_, Infallible>(false), 0).unwrap();
    assert!(ADJECTIVES.iter().any(|a| nick.starts_with(a)), "{nick}");
    assert!(ANIMALS.iter().any(|a| nick.ends_with(a)), "{nick}");
    assert!(is_valid_nickname(&nick));
  }

  #[test]
  fn retries_until_free() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut seen = Vec::new();
    let nick = generate_nickname(
      &mut rng,
      |c| {
        seen.push(c.to_string());
        Ok::<_, Infallible>(seen.len() < 4)
      },
      0,
    )
    .unwrap();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen.last().unwrap(), &nick);
  }

  #[test]
  fn falls_back_to_timestamp_after_ten_attempts() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut calls = 0;
    let nick = generate_nickname(
      &mut rng,
      |_| {
        calls += 1;
        Ok::<_, Infallible>(true)
      },
      1_760_000_000_123,
    )
    .unwrap();
    assert_eq!(calls, MAX_NICKNAME_ATTEMPTS);
    assert!(nick.ends_with("00123"), "{nick}");
    assert!(!nick.contains("1760"), "{nick}");
    assert!(is_valid_nickname(&nick), "{nick}");
  }

  #[test]
  fn longest_fallback_nickname_is_still_valid() {
    let adj = ADJECTIVES.iter().max_by_key(|a| a.len()).unwrap();
    let animal = ANIMALS.iter().max_by_key(|a| a.len()).unwrap();
    let longest = format!("{adj}{animal}{}", "9".repeat(FALLBACK_SUFFIX_DIGITS as usize));
    assert!(is_valid_nickname(&longest), "{longest}");
  }

  #[test]
  fn predicate_errors_propagate() {
    let mut rng = StdRng::seed_from_u64(3);
    let res: Result<String, &str> = generate_nickname(&mut rng, |_| Err("db down"), 0);
    assert_eq!(res, Err("db down"));
  }

  #[test]
  fn avatar_comes_from_palettes() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut emojis = HashSet::new();
    for _ in 0..50 {
      let a = random_avatar(&mut rng);
      assert!(is_avatar_emoji(&a.emoji));
      assert!(is_hex_color(&a.color));
      emojis.insert(a.emoji);
    }
    assert!(emojis.len() > 1);
  }

  #[test]
  fn nickname_validation() {
    assert!(is_valid_nickname("Ace_42"));
    assert!(!is_valid_nickname("ab"));
    assert!(!is_valid_nickname("has space"));
    assert!(!is_valid_nickname("waytoolongnickname_123"));
    assert!(!is_valid_nickname("émile"));
  }

  #[test]
  fn hex_color_validation() {
    assert!(is_hex_color("#a1B2c3"));
    assert!(!is_hex_color("a1b2c3"));
    assert!(!is_hex_color("#12345"));
    assert!(!is_hex_color("#12345g"));
  }
}
