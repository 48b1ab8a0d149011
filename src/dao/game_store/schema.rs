//! Table layout and statement builders shared by the SQL backends.
//!
//! Every statement is built through sea-query and bound through
//! sea-query-binder, so payloads and ids always travel as bind parameters.

use sea_query::{
    Alias, ColumnDef, Expr, Func, OnConflict, Query, QueryBuilder, SchemaBuilder, Table,
};
use sea_query_binder::{SqlxBinder, SqlxValues};

/// Name of the count column produced by [`count_sessions`].
pub const COUNT_COLUMN: &str = "matches";

/// Sessions table schema.
#[derive(sea_query::Iden)]
pub enum Games {
    /// The `games` table.
    Table,
    /// Session id, primary key.
    #[iden = "game_id"]
    GameId,
    /// Opaque payload.
    #[iden = "game"]
    Game,
    /// Insertion time.
    #[iden = "created_time"]
    CreatedTime,
}

/// `CREATE TABLE IF NOT EXISTS games (...)` for the given dialect.
pub fn create_table<B: SchemaBuilder>(builder: B) -> String {
    Table::create()
        .table(Games::Table)
        .if_not_exists()
        .col(ColumnDef::new(Games::GameId).text().not_null().primary_key())
        .col(ColumnDef::new(Games::Game).text().not_null())
        .col(
            ColumnDef::new(Games::CreatedTime)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .build(builder)
}

/// Count rows for `session_id`; the result column is [`COUNT_COLUMN`].
pub fn count_sessions<B: QueryBuilder>(builder: B, session_id: &str) -> (String, SqlxValues) {
    Query::select()
        .expr_as(
            Func::count(Expr::col(Games::GameId)),
            Alias::new(COUNT_COLUMN),
        )
        .from(Games::Table)
        .and_where(Expr::col(Games::GameId).eq(session_id))
        .build_sqlx(builder)
}

/// Select the payload of `session_id`.
pub fn select_payload<B: QueryBuilder>(builder: B, session_id: &str) -> (String, SqlxValues) {
    Query::select()
        .column(Games::Game)
        .from(Games::Table)
        .and_where(Expr::col(Games::GameId).eq(session_id))
        .build_sqlx(builder)
}

/// Plain insert; `created_time` comes from the column default.
pub fn insert_session<B: QueryBuilder>(
    builder: B,
    session_id: &str,
    payload: &str,
) -> (String, SqlxValues) {
    Query::insert()
        .into_table(Games::Table)
        .columns([Games::GameId, Games::Game])
        .values_panic([session_id.into(), payload.into()])
        .build_sqlx(builder)
}

/// Overwrite the payload of `session_id`.
pub fn update_payload<B: QueryBuilder>(
    builder: B,
    session_id: &str,
    payload: &str,
) -> (String, SqlxValues) {
    Query::update()
        .table(Games::Table)
        .values([(Games::Game, payload.into())])
        .and_where(Expr::col(Games::GameId).eq(session_id))
        .build_sqlx(builder)
}

/// Insert-or-replace in one statement. Only the payload is overwritten on
/// conflict so `created_time` keeps the first insert's value.
pub fn upsert_session<B: QueryBuilder>(
    builder: B,
    session_id: &str,
    payload: &str,
) -> (String, SqlxValues) {
    Query::insert()
        .into_table(Games::Table)
        .columns([Games::GameId, Games::Game])
        .values_panic([session_id.into(), payload.into()])
        .on_conflict(
            OnConflict::column(Games::GameId)
                .update_column(Games::Game)
                .to_owned(),
        )
        .build_sqlx(builder)
}
