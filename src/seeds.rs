//! Built-in content and the TOML question-bank import.
//!
//! The built-ins guarantee a fresh install is playable without the admin panel or OpenAI.

use diesel::{Connection, SqliteConnection};
use tracing::{info, instrument, warn};

use crate::config::BankQuestion;
use crate::db::models::{Category, FeatureFlag, Question};
use crate::db::{catalog, new_id, now, questions};
use crate::domain::{Difficulty, QuestionSource, QuestionStatus};
use crate::error::ApiError;
use crate::logic::catalog::is_valid_slug;

/// (slug, name, emoji)
const SEED_CATEGORIES: &[(&str, &str, &str)] = &[
  ("science", "Science", "🔬"),
  ("history", "History", "🏛️"),
  ("animals", "Animals", "🐾"),
  ("geography", "Geography", "🌍"),
  ("space", "Space", "🚀"),
];

/// (category slug, statement, is_fact, explanation, difficulty)
const SEED_QUESTIONS: &[(&str, &str, bool, &str, Difficulty)] = &[
  ("science", "Water boils at a lower temperature at high altitude.", true,
   "Lower air pressure means water reaches its boiling point sooner.", Difficulty::Easy),
  ("science", "Humans only use ten percent of their brains.", false,
   "Brain imaging shows activity across virtually all regions.", Difficulty::Easy),
  ("science", "Bananas are slightly radioactive.", true,
   "They contain potassium-40, a naturally occurring isotope.", Difficulty::Medium),
  ("history", "The Great Wall of China is visible from the Moon with the naked eye.", false,
   "It is far too narrow to be seen from that distance.", Difficulty::Easy),
  ("history", "Cleopatra lived closer in time to the Moon landing than to the building of the Great Pyramid.", true,
   "The Great Pyramid predates her by about 2,500 years; Apollo 11 came about 2,000 years after.", Difficulty::Hard),
  ("history", "Napoleon was unusually short for a Frenchman of his time.", false,
   "He was around average height; the myth comes from unit confusion and British cartoons.", Difficulty::Medium),
  ("animals", "Octopuses have three hearts.", true,
   "Two pump blood through the gills and one through the rest of the body.", Difficulty::Medium),
  ("animals", "Goldfish have a memory span of only three seconds.", false,
   "Experiments show goldfish can remember things for months.", Difficulty::Easy),
  ("animals", "A group of flamingos is called a flamboyance.", true,
   "Flamboyance is the accepted collective noun.", Difficulty::Medium),
  ("geography", "Australia is wider than the Moon.", true,
   "Australia spans about 4,000 km; the Moon's diameter is about 3,475 km.", Difficulty::Hard),
  ("geography", "Mount Everest is the tallest mountain measured from base to peak.", false,
   "Mauna Kea is taller from its base on the ocean floor.", Difficulty::Medium),
  ("space", "A day on Venus is longer than its year.", true,
   "Venus takes about 243 Earth days to rotate and 225 to orbit the Sun.", Difficulty::Medium),
  ("space", "There is no gravity on the International Space Station.", false,
   "Gravity there is about 90% of Earth's; astronauts float because they are in free fall.", Difficulty::Easy),
];

/// (key, enabled, description)
const DEFAULT_FLAGS: &[(&str, bool, &str)] = &[
  ("daily_sets", true, "Show the daily set on the home screen"),
  ("free_play", true, "Allow unlimited random questions"),
  ("leaderboard", true, "Show the leaderboard tab"),
  ("notifications", false, "Show the in-app notification inbox"),
];

/// Insert built-in categories, questions and flags when the database has no categories.
/// Returns whether anything was inserted.
#[instrument(level = "info", skip_all)]
pub fn seed_if_empty(conn: &mut SqliteConnection) -> Result<bool, ApiError> {
  if catalog::count_categories(conn)? > 0 {
    return Ok(false);
  }

  conn.transaction::<_, ApiError, _>(|conn| {
    let at = now();
    let mut slug_to_id = Vec::with_capacity(SEED_CATEGORIES.len());
    for (i, (slug, name, emoji)) in SEED_CATEGORIES.iter().enumerate() {
      let c = Category {
        id: new_id(),
        slug: (*slug).into(),
        name: (*name).into(),
        emoji: (*emoji).into(),
        sort_order: i as i32,
        is_active: true,
        created_at: at,
      };
      catalog::insert_category(conn, &c)?;
      slug_to_id.push((*slug, c.id));
    }

    for (slug, statement, is_fact, explanation, difficulty) in SEED_QUESTIONS {
      let Some((_, category_id)) = slug_to_id.iter().find(|(s, _)| s == slug) else {
        continue;
      };
      questions::insert(conn, &bank_row(category_id, statement, *is_fact, explanation, *difficulty))?;
    }

    for (key, enabled, description) in DEFAULT_FLAGS {
      catalog::upsert_flag(conn, &FeatureFlag {
        key: (*key).into(),
        enabled: *enabled,
        description: (*description).into(),
        updated_at: at,
      })?;
    }
    Ok(())
  })?;

  info!(
    target: "trivia_backend",
    categories = SEED_CATEGORIES.len(),
    questions = SEED_QUESTIONS.len(),
    flags = DEFAULT_FLAGS.len(),
    "Seeded empty database"
  );
  Ok(true)
}

/// Load TOML bank questions as approved. Statements already present are skipped, unknown
/// category slugs are created. Returns the number of inserted questions.
#[instrument(level = "info", skip_all, fields(bank = bank.len()))]
pub fn import_bank(conn: &mut SqliteConnection, bank: &[BankQuestion]) -> Result<usize, ApiError> {
  conn.transaction::<_, ApiError, _>(|conn| {
    let mut inserted = 0;
    for bq in bank {
      let statement = bq.statement.trim();
      let n = statement.chars().count();
      if !(10..=500).contains(&n) {
        warn!(target: "trivia_backend", category = %bq.category, "Skipping bank item: statement must be 10-500 chars");
        continue;
      }
      let slug = normalize_slug(&bq.category);
      if !is_valid_slug(&slug) {
        warn!(target: "trivia_backend", category = %bq.category, "Skipping bank item: category slug must be 2-40 chars of [a-z0-9-]");
        continue;
      }
      if questions::statement_exists(conn, statement)? {
        continue;
      }
      let category = match catalog::find_category_by_slug(conn, &slug)? {
        Some(c) => c,
        None => {
          let c = Category {
            id: new_id(),
            name: title_case(&slug),
            slug,
            emoji: "❓".into(),
            sort_order: 100,
            is_active: true,
            created_at: now(),
          };
          catalog::insert_category(conn, &c)?;
          info!(target: "trivia_backend", slug = %c.slug, "Created category for bank questions");
          c
        }
      };
      let row = bank_row(&category.id, statement, bq.is_fact, bq.explanation.trim(), bq.difficulty.unwrap_or_default());
      questions::insert(conn, &row)?;
      inserted += 1;
    }
    Ok(inserted)
  })
}

/// Lowercase with spaces and underscores turned into hyphens. "Space Facts" becomes "space-facts".
fn normalize_slug(raw: &str) -> String {
  raw
    .trim()
    .chars()
    .map(|c| match c {
      ' ' | '_' => '-',
      c => c.to_ascii_lowercase(),
    })
    .collect()
}

fn bank_row(category_id: &str, statement: &str, is_fact: bool, explanation: &str, difficulty: Difficulty) -> Question {
  let at = now();
  Question {
    id: new_id(),
    category_id: category_id.into(),
    statement: statement.into(),
    is_fact,
    explanation: explanation.into(),
    difficulty: difficulty.as_str().into(),
    status: QuestionStatus::Approved.as_str().into(),
    source: QuestionSource::Bank.as_str().into(),
    image_url: None,
    created_at: at,
    updated_at: at,
  }
}

/// "pop-culture" -> "Pop Culture"
fn title_case(slug: &str) -> String {
  slug
    .split(|c: char| c == '-' || c == '_')
    .filter(|w| !w.is_empty())
    .map(|w| {
      let mut chars = w.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}
