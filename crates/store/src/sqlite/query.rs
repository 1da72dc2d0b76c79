//! Generic query builders shared by every record kind.

use sea_query::{Expr, Query, SqliteQueryBuilder};

use super::SqlRecord;

pub type Built = (String, sea_query::Values);

/// SELECT every row of the record's table in its natural order.
pub fn select_all<R: SqlRecord>() -> Built {
    let (column, order) = R::order_by();
    Query::select()
        .columns(R::columns())
        .from(R::table())
        .order_by(column, order)
        .order_by(R::id_column(), sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}

/// SELECT a single row by primary key.
pub fn select_by_id<R: SqlRecord>(id: &str) -> Built {
    Query::select()
        .columns(R::columns())
        .from(R::table())
        .and_where(Expr::col(R::id_column()).eq(id))
        .build(SqliteQueryBuilder)
}

/// INSERT a whole record.
pub fn insert<R: SqlRecord>(record: &R) -> Built {
    Query::insert()
        .into_table(R::table())
        .columns(R::columns())
        .values_panic(record.values())
        .build(SqliteQueryBuilder)
}

/// UPDATE every non-key column of an existing row.
pub fn update<R: SqlRecord>(record: &R, id: &str) -> Built {
    let assignments = R::columns().into_iter().zip(record.values()).skip(1);
    Query::update()
        .table(R::table())
        .values(assignments)
        .and_where(Expr::col(R::id_column()).eq(id))
        .build(SqliteQueryBuilder)
}

/// DELETE a row by primary key.
pub fn delete<R: SqlRecord>(id: &str) -> Built {
    Query::delete()
        .from_table(R::table())
        .and_where(Expr::col(R::id_column()).eq(id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdrtables_core::Registration;

    #[test]
    fn test_select_all_orders_by_natural_key_then_id() {
        let (sql, values) = select_all::<Registration>();
        assert!(sql.starts_with(r#"SELECT "id", "session_id""#), "{sql}");
        assert!(
            sql.ends_with(r#"ORDER BY "registered_at" ASC, "id" ASC"#),
            "{sql}"
        );
        assert!(values.0.is_empty());
    }

    #[test]
    fn test_update_skips_primary_key_assignment() {
        let campaign = jdrtables_core::testing::campaign("c1", "gm", "Dragons");
        let (sql, values) = update(&campaign, &campaign.id);
        assert!(sql.starts_with(r#"UPDATE "campaigns" SET "name" = ?"#), "{sql}");
        assert!(sql.ends_with(r#"WHERE "id" = ?"#), "{sql}");
        // Eight assignments (name_key included) plus the WHERE binding.
        assert_eq!(values.0.len(), 9);
    }
}
