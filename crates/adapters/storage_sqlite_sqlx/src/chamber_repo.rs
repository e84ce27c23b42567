//! `SQLite` implementation of [`ChamberRepository`].
//!
//! A chamber is stored as one row: its id, name and modification time as
//! columns, and the complete definition as a JSON document.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use fermhub_app::ports::ChamberRepository;
use fermhub_domain::chamber::Chamber;
use fermhub_domain::error::FermHubError;
use fermhub_domain::id::ChamberId;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Chamber`].
struct Wrapper(Chamber);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Chamber> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let body: String = row.try_get("body")?;
        let chamber =
            serde_json::from_str(&body).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        Ok(Self(chamber))
    }
}

const UPSERT: &str = "INSERT INTO chambers (id, name, body, mod_time) VALUES (?, ?, ?, ?) \
     ON CONFLICT(id) DO UPDATE SET \
     name = excluded.name, body = excluded.body, mod_time = excluded.mod_time";
const SELECT_BY_ID: &str = "SELECT body FROM chambers WHERE id = ?";
const SELECT_ALL: &str = "SELECT body FROM chambers ORDER BY name";
const DELETE_BY_ID: &str = "DELETE FROM chambers WHERE id = ?";

/// `SQLite`-backed chamber repository.
pub struct SqliteChamberRepository {
    pool: SqlitePool,
}

impl SqliteChamberRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ChamberRepository for SqliteChamberRepository {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Chamber>, FermHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn get_by_id(
        &self,
        id: ChamberId,
    ) -> impl Future<Output = Result<Option<Chamber>, FermHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn save(&self, chamber: Chamber) -> impl Future<Output = Result<Chamber, FermHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let body = serde_json::to_string(&chamber).map_err(StorageError::from)?;
            sqlx::query(UPSERT)
                .bind(chamber.id.to_string())
                .bind(&chamber.name)
                .bind(body)
                .bind(chamber.mod_time.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            tracing::debug!(chamber_id = %chamber.id, "chamber stored");
            Ok(chamber)
        }
    }

    fn delete(&self, id: ChamberId) -> impl Future<Output = Result<(), FermHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use fermhub_domain::batch::{Batch, Fermentation, FermentationStep, Recipe};
    use fermhub_domain::control::{ControlSettings, PidGains};
    use fermhub_domain::device::{DeviceConfig, DeviceRole, DeviceType};

    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteChamberRepository {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        SqliteChamberRepository::new(db.pool().clone())
    }

    fn test_chamber(name: &str) -> Chamber {
        Chamber::builder()
            .name(name)
            .device(DeviceConfig::new(
                "28-0000071cbc72",
                DeviceType::Ds18b20,
                &[DeviceRole::BeerThermometer],
            ))
            .device(DeviceConfig::new("GPIO2", DeviceType::Gpio, &[DeviceRole::Chiller]))
            .control(ControlSettings::Pid {
                chiller: PidGains::new(10.0, 0.0001, 500.0),
                heater: PidGains::new(0.6, 0.0001, 5.0),
            })
            .current_batch(Batch {
                id: "b1".to_string(),
                number: 3,
                recipe: Recipe {
                    name: "Stout".to_string(),
                    fermentation: Fermentation {
                        name: "Ale".to_string(),
                        steps: vec![FermentationStep::new("Primary", 19.0, 10)],
                    },
                    original_gravity: 1.070,
                    final_gravity: 1.018,
                },
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_save_and_retrieve_chamber() {
        let repo = setup().await;
        let chamber = test_chamber("Fermenter 1");
        let id = chamber.id;

        repo.save(chamber.clone()).await.unwrap();

        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched, chamber);
    }

    #[tokio::test]
    async fn should_return_none_when_chamber_not_found() {
        let repo = setup().await;
        let result = repo.get_by_id(ChamberId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_replace_chamber_with_same_id() {
        let repo = setup().await;
        let mut chamber = test_chamber("Fermenter 1");
        repo.save(chamber.clone()).await.unwrap();

        chamber.name = "Keezer".to_string();
        chamber.devices.clear();
        repo.save(chamber.clone()).await.unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all, vec![chamber]);
    }

    #[tokio::test]
    async fn should_list_chambers_ordered_by_name() {
        let repo = setup().await;
        repo.save(test_chamber("Keezer")).await.unwrap();
        repo.save(test_chamber("Brite Tank")).await.unwrap();

        let names: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Brite Tank", "Keezer"]);
    }

    #[tokio::test]
    async fn should_delete_chamber() {
        let repo = setup().await;
        let chamber = test_chamber("Fermenter 1");
        let id = chamber.id;
        repo.save(chamber).await.unwrap();

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
        repo.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn should_fail_to_decode_corrupted_body() {
        let repo = setup().await;
        let id = ChamberId::new();
        sqlx::query(UPSERT)
            .bind(id.to_string())
            .bind("Broken")
            .bind("{not json")
            .bind("2026-01-01T00:00:00Z")
            .execute(&repo.pool)
            .await
            .unwrap();

        assert!(matches!(
            repo.get_by_id(id).await,
            Err(FermHubError::Storage(_))
        ));
    }
}
