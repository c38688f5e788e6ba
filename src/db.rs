use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::models::{ActivitySnapshot, AssessorSlot, StoredSlot, UserTotals};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, week: i32) -> anyhow::Result<usize> {
    let day = NaiveDate::from_ymd_opt(2024, 6, 3).context("invalid date")?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for n in 0..14u32 {
        let user_address = format!("0x{:040x}", 0xa11ce + u64::from(n) * 0x1f3);
        let actions = f64::from(n % 6 + 1);
        let volume = f64::from(n * 37 % 400);

        let snapshots = [
            // Earlier stETH reading, superseded by the next row.
            ("stETH", 9, actions, volume * 0.5),
            ("stETH", 18, actions + 2.0, volume),
            ("4626", 12, f64::from(n % 3), volume * 0.25),
        ];

        for (index, (pool_type, hour, actions, volume)) in snapshots.into_iter().enumerate() {
            let snapshot = ActivitySnapshot {
                user_address: user_address.clone(),
                pool_type: Some(pool_type.to_string()),
                timestamp: day.and_hms_opt(hour, 0, 0),
                action_count_longs: Some(actions),
                volume_longs: Some(volume * 0.6),
                volume_lps: Some(volume * 0.4),
                ..Default::default()
            };
            let source_key = format!("seed-w{week}-{n:02}-{index}");
            if insert_snapshot(&mut tx, week, &snapshot, &source_key).await? {
                inserted += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

async fn insert_snapshot(
    tx: &mut Transaction<'_, Postgres>,
    week: i32,
    snapshot: &ActivitySnapshot,
    source_key: &str,
) -> anyhow::Result<bool> {
    sqlx::query(
        "INSERT INTO assessor_slots.users (address) VALUES ($1) ON CONFLICT (address) DO NOTHING",
    )
    .bind(&snapshot.user_address)
    .execute(&mut **tx)
    .await?;

    let result = sqlx::query(
        r#"
        INSERT INTO assessor_slots.statistics
        (week, user_address, pool_type, "timestamp",
         action_count_longs, action_count_shorts, action_count_lps,
         volume_longs, volume_shorts, volume_lps, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(week)
    .bind(&snapshot.user_address)
    .bind(&snapshot.pool_type)
    .bind(snapshot.timestamp)
    .bind(snapshot.action_count_longs)
    .bind(snapshot.action_count_shorts)
    .bind(snapshot.action_count_lps)
    .bind(snapshot.volume_longs)
    .bind(snapshot.volume_shorts)
    .bind(snapshot.volume_lps)
    .bind(source_key)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Snapshots for a week in ingestion order.
pub async fn fetch_snapshots(pool: &PgPool, week: i32) -> anyhow::Result<Vec<ActivitySnapshot>> {
    let rows = sqlx::query(
        r#"
        SELECT user_address, pool_type, "timestamp",
               action_count_longs, action_count_shorts, action_count_lps,
               volume_longs, volume_shorts, volume_lps
        FROM assessor_slots.statistics
        WHERE week = $1
        ORDER BY id
        "#,
    )
    .bind(week)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for row in rows {
        snapshots.push(ActivitySnapshot {
            user_address: row.get("user_address"),
            pool_type: row.get("pool_type"),
            timestamp: row.get("timestamp"),
            action_count_longs: row.get("action_count_longs"),
            action_count_shorts: row.get("action_count_shorts"),
            action_count_lps: row.get("action_count_lps"),
            volume_longs: row.get("volume_longs"),
            volume_shorts: row.get("volume_shorts"),
            volume_lps: row.get("volume_lps"),
        });
    }

    Ok(snapshots)
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    week: i32,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        user_address: String,
        pool_type: Option<String>,
        timestamp: Option<NaiveDateTime>,
        action_count_longs: Option<f64>,
        action_count_shorts: Option<f64>,
        action_count_lps: Option<f64>,
        volume_longs: Option<f64>,
        volume_shorts: Option<f64>,
        volume_lps: Option<f64>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let snapshot = ActivitySnapshot {
            user_address: row.user_address,
            pool_type: row.pool_type.filter(|value| !value.is_empty()),
            timestamp: row.timestamp,
            action_count_longs: row.action_count_longs,
            action_count_shorts: row.action_count_shorts,
            action_count_lps: row.action_count_lps,
            volume_longs: row.volume_longs,
            volume_shorts: row.volume_shorts,
            volume_lps: row.volume_lps,
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_snapshot(&mut tx, week, &snapshot, &source_key).await? {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn fetch_totals(pool: &PgPool, week: i32) -> anyhow::Result<Vec<UserTotals>> {
    let rows = sqlx::query(
        r#"
        SELECT user_address, week, total_actions, volumes
        FROM assessor_slots.totals
        WHERE week = $1
        ORDER BY user_address
        "#,
    )
    .bind(week)
    .fetch_all(pool)
    .await?;

    let mut totals = Vec::with_capacity(rows.len());
    for row in rows {
        let volumes: Json<BTreeMap<String, f64>> = row.get("volumes");
        totals.push(UserTotals {
            user_address: row.get("user_address"),
            week: row.get("week"),
            total_actions: row.get("total_actions"),
            volumes: volumes.0,
        });
    }

    Ok(totals)
}

/// Supersede every stored total for the week.
pub async fn replace_totals(pool: &PgPool, week: i32, totals: &[UserTotals]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM assessor_slots.totals WHERE week = $1")
        .bind(week)
        .execute(&mut *tx)
        .await?;

    for user in totals {
        sqlx::query(
            r#"
            INSERT INTO assessor_slots.totals
            (id, week, user_address, total_actions, volumes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(week)
        .bind(&user.user_address)
        .bind(user.total_actions)
        .bind(Json(&user.volumes))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Week of the assessor's unfinished slot, whatever week it was assigned in.
pub async fn open_slot_week(pool: &PgPool, assessor: &str) -> anyhow::Result<Option<i32>> {
    let row = sqlx::query(
        r#"
        SELECT week
        FROM assessor_slots.assessor_slot
        WHERE assessor_id = $1 AND done = FALSE
        ORDER BY week
        LIMIT 1
        "#,
    )
    .bind(assessor)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row.get("week")))
}

pub async fn insert_slot(pool: &PgPool, slot: &AssessorSlot) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO assessor_slots.assessor (address) VALUES ($1) ON CONFLICT (address) DO NOTHING",
    )
    .bind(&slot.assessor)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO assessor_slots.assessor_slot (id, assessor_id, week, done)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(&slot.assessor)
    .bind(slot.week)
    .bind(slot.done)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("failed to store slot for {} (week {})", slot.assessor, slot.week))?;

    for (position, user) in slot.users.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO assessor_slots.assessor_slot_user (assessor_slot_id, position, user_address)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(i32::try_from(position)?)
        .bind(user)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(id)
}

pub async fn fetch_slot(
    pool: &PgPool,
    assessor: &str,
    week: i32,
) -> anyhow::Result<Option<StoredSlot>> {
    let Some(row) = sqlx::query(
        r#"
        SELECT id, assessor_id, week, done
        FROM assessor_slots.assessor_slot
        WHERE assessor_id = $1 AND week = $2
        "#,
    )
    .bind(assessor)
    .bind(week)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let id: Uuid = row.get("id");
    let users = fetch_slot_users(pool, id).await?;

    Ok(Some(StoredSlot {
        id,
        slot: AssessorSlot {
            assessor: row.get("assessor_id"),
            week: row.get("week"),
            done: row.get("done"),
            users,
        },
    }))
}

pub async fn list_slots(pool: &PgPool, week: i32) -> anyhow::Result<Vec<StoredSlot>> {
    let rows = sqlx::query(
        r#"
        SELECT id, assessor_id, week, done
        FROM assessor_slots.assessor_slot
        WHERE week = $1
        ORDER BY created_at, assessor_id
        "#,
    )
    .bind(week)
    .fetch_all(pool)
    .await?;

    let mut slots = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.get("id");
        slots.push(StoredSlot {
            id,
            slot: AssessorSlot {
                assessor: row.get("assessor_id"),
                week: row.get("week"),
                done: row.get("done"),
                users: fetch_slot_users(pool, id).await?,
            },
        });
    }

    Ok(slots)
}

async fn fetch_slot_users(pool: &PgPool, slot_id: Uuid) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT user_address
        FROM assessor_slots.assessor_slot_user
        WHERE assessor_slot_id = $1
        ORDER BY position
        "#,
    )
    .bind(slot_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("user_address")).collect())
}
