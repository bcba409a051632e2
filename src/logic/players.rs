//! Device registration, profile and stats.

use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, instrument};

use crate::db::models::{User, UserChanges};
use crate::db::{new_id, now, users};
use crate::error::ApiError;
use crate::names::{generate_nickname, is_avatar_emoji, is_hex_color, is_valid_nickname, random_avatar};
use crate::protocol::{ProfileOut, RegisterOut, StatsOut, UpdateProfileIn, UserOut};
use crate::state::AppState;

/// Printable, no surrounding whitespace, 8..=128 chars.
pub fn is_valid_device_id(s: &str) -> bool {
  let n = s.chars().count();
  (8..=128).contains(&n) && s.trim() == s && s.chars().all(|c| !c.is_control())
}

/// Find-or-create the user for a device id.
#[instrument(level = "info", skip(state, device_id), fields(device_len = device_id.len()))]
pub async fn register(state: &AppState, device_id: String) -> Result<RegisterOut, ApiError> {
  if !is_valid_device_id(&device_id) {
    return Err(ApiError::bad_request("deviceId must be 8-128 printable characters"));
  }

  let (user, created) = state
    .db
    .run(move |conn| {
      if let Some(u) = users::find_by_device(conn, &device_id)? {
        return Ok((u, false));
      }

      let mut rng = rand::thread_rng();
      let millis = Utc::now().timestamp_millis();
      let nickname = generate_nickname(&mut rng, |c| users::nickname_taken(conn, c, None), millis)?;
      let avatar = random_avatar(&mut rng);
      let at = now();
      let user = User {
        id: new_id(),
        device_id: device_id.clone(),
        nickname,
        avatar_emoji: avatar.emoji,
        avatar_color: avatar.color,
        created_at: at,
        updated_at: at,
        last_seen_at: at,
      };

      match users::insert(conn, &user) {
        Ok(()) => Ok((user, true)),
        // Lost a race with a concurrent registration for the same device.
        Err(ApiError::Conflict(msg)) => match users::find_by_device(conn, &device_id)? {
          Some(u) => Ok((u, false)),
          None => Err(ApiError::Conflict(msg)),
        },
        Err(e) => Err(e),
      }
    })
    .await?;

  if created {
    info!(target: "trivia_backend", user_id = %user.id, nickname = %user.nickname, "Registered new player");
  }
  Ok(RegisterOut { user: UserOut::from(&user), created })
}

/// Profile plus aggregate stats.
#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn profile(state: &AppState, user: User, today: NaiveDate) -> Result<ProfileOut, ApiError> {
  let uid = user.id.clone();
  let totals = state.db.run(move |conn| users::totals(conn, &uid)).await?;

  let accuracy = if totals.total_answers > 0 {
    totals.correct_answers as f64 / totals.total_answers as f64
  } else {
    0.0
  };
  let stats = StatsOut {
    total_answers: totals.total_answers,
    correct_answers: totals.correct_answers,
    accuracy,
    daily_sets_played: totals.daily_sets_played,
    best_daily_score: totals.best_daily_score,
    current_streak: current_streak(&totals.played_dates, today),
  };
  Ok(ProfileOut { user: UserOut::from(&user), stats })
}

/// Consecutive played days ending today or yesterday. `dates` must be newest first.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
  let Some(&latest) = dates.first() else {
    return 0;
  };
  if latest != today && latest != today - Duration::days(1) {
    return 0;
  }
  let mut streak = 0;
  let mut expected = latest;
  for &d in dates {
    if d == expected {
      streak += 1;
      expected = expected - Duration::days(1);
    } else if d < expected {
      break;
    }
  }
  streak
}

#[instrument(level = "info", skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_profile(state: &AppState, user: User, body: UpdateProfileIn) -> Result<UserOut, ApiError> {
  let nickname = body.nickname.map(|s| s.trim().to_string());
  if let Some(n) = &nickname {
    if !is_valid_nickname(n) {
      return Err(ApiError::bad_request("nickname must be 3-20 characters of letters, digits or _"));
    }
  }
  if let Some(e) = &body.avatar_emoji {
    if !is_avatar_emoji(e) {
      return Err(ApiError::bad_request("avatarEmoji must be one of the avatar palette emoji"));
    }
  }
  if let Some(c) = &body.avatar_color {
    if !is_hex_color(c) {
      return Err(ApiError::bad_request("avatarColor must be a #RRGGBB hex color"));
    }
  }

  let changes = UserChanges {
    nickname,
    avatar_emoji: body.avatar_emoji,
    avatar_color: body.avatar_color,
    updated_at: Some(now()),
  };
  let uid = user.id.clone();
  let updated = state
    .db
    .run(move |conn| {
      if let Some(n) = &changes.nickname {
        if users::nickname_taken(conn, n, Some(&uid))? {
          return Err(ApiError::conflict(format!("Nickname '{n}' is already taken")));
        }
      }
      users::update(conn, &uid, &changes)
    })
    .await?;

  if updated.nickname != user.nickname {
    info!(target: "trivia_backend", user_id = %updated.id, from = %user.nickname, to = %updated.nickname, "Nickname changed");
  }
  Ok(UserOut::from(&updated))
}
