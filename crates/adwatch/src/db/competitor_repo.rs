//! Competitor rows. The status manager only ever counts them.

use rusqlite::params;

use super::{Database, DatabaseError};

/// A raw competitor row.
#[derive(Debug, Clone)]
pub struct CompetitorRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

/// Inserts a competitor row.
pub fn insert(db: &Database, competitor: &CompetitorRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO competitors (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                competitor.id,
                competitor.user_id,
                competitor.name,
                competitor.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Counts the competitors tracked by `user_id`.
pub fn count_by_user(db: &Database, user_id: &str) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM competitors WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitor(id: &str, user_id: &str) -> CompetitorRow {
        CompetitorRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("Competitor {}", id),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_count_by_user() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &competitor("c1", "u1")).unwrap();
        insert(&db, &competitor("c2", "u1")).unwrap();
        insert(&db, &competitor("c3", "u2")).unwrap();

        assert_eq!(count_by_user(&db, "u1").unwrap(), 2);
        assert_eq!(count_by_user(&db, "u2").unwrap(), 1);
        assert_eq!(count_by_user(&db, "nobody").unwrap(), 0);
    }
}
