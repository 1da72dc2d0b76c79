//! Column mappings for each record kind.
//! Column order in `columns()` must match `values()` and `from_row()`.

use chrono::{DateTime, SecondsFormat, Utc};
use jdrtables_core::{
    Campaign, EventLog, GameType, Invitation, InvitationStatus, InvitationTarget, Registration,
    RegistrationStatus, Session, SessionStatus,
};
use rusqlite::Row;
use rusqlite::types::Type;
use sea_query::{Order, SimpleExpr};

use super::SqlRecord;
use super::tables::{Campaigns, EventLogs, Invitations, Registrations, Sessions};

// ── Helpers ────────────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ts(value: DateTime<Utc>) -> SimpleExpr {
    format_ts(value).into()
}

fn opt_ts(value: Option<DateTime<Utc>>) -> SimpleExpr {
    value.map(format_ts).into()
}

fn json_text<T: serde::Serialize>(value: &T) -> SimpleExpr {
    serde_json::to_string(value).unwrap_or_default().into()
}

fn conversion_error(idx: usize, detail: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, detail.into())
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}")))
}

fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}"))),
        None => Ok(None),
    }
}

fn get_enum<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value {raw:?}")))
}

fn get_json<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

// ── Sessions ───────────────────────────────────────────────────────────────

impl SqlRecord for Session {
    type Column = Sessions;

    fn table() -> Sessions {
        Sessions::Table
    }

    fn id_column() -> Sessions {
        Sessions::Id
    }

    fn columns() -> Vec<Sessions> {
        vec![
            Sessions::Id,
            Sessions::GameType,
            Sessions::Title,
            Sessions::Description,
            Sessions::System,
            Sessions::CampaignId,
            Sessions::SessionNumber,
            Sessions::DmId,
            Sessions::StartsAt,
            Sessions::EndsAt,
            Sessions::MinPlayers,
            Sessions::MaxPlayers,
            Sessions::TriggerWarnings,
            Sessions::ExternalUrl,
            Sessions::Status,
            Sessions::DeletedAt,
            Sessions::CreatedAt,
            Sessions::UpdatedAt,
        ]
    }

    fn values(&self) -> Vec<SimpleExpr> {
        vec![
            self.id.clone().into(),
            self.game_type.as_str().into(),
            self.title.clone().into(),
            self.description.clone().into(),
            self.system.clone().into(),
            self.campaign_id.clone().into(),
            i64::from(self.session_number).into(),
            self.dm_id.clone().into(),
            ts(self.starts_at),
            ts(self.ends_at),
            i64::from(self.min_players).into(),
            i64::from(self.max_players).into(),
            json_text(&self.trigger_warnings),
            self.external_url.clone().into(),
            self.status.as_str().into(),
            opt_ts(self.deleted_at),
            ts(self.created_at),
            ts(self.updated_at),
        ]
    }

    fn order_by() -> (Sessions, Order) {
        (Sessions::StartsAt, Order::Asc)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Session {
            id: row.get(0)?,
            game_type: get_enum(row, 1, GameType::parse)?,
            title: row.get(2)?,
            description: row.get(3)?,
            system: row.get(4)?,
            campaign_id: row.get(5)?,
            session_number: row.get(6)?,
            dm_id: row.get(7)?,
            starts_at: get_ts(row, 8)?,
            ends_at: get_ts(row, 9)?,
            min_players: row.get(10)?,
            max_players: row.get(11)?,
            trigger_warnings: get_json(row, 12)?,
            external_url: row.get(13)?,
            status: get_enum(row, 14, SessionStatus::parse)?,
            deleted_at: get_opt_ts(row, 15)?,
            created_at: get_ts(row, 16)?,
            updated_at: get_ts(row, 17)?,
        })
    }
}

// ── Campaigns ──────────────────────────────────────────────────────────────

impl SqlRecord for Campaign {
    type Column = Campaigns;

    fn table() -> Campaigns {
        Campaigns::Table
    }

    fn id_column() -> Campaigns {
        Campaigns::Id
    }

    fn columns() -> Vec<Campaigns> {
        vec![
            Campaigns::Id,
            Campaigns::Name,
            Campaigns::GmId,
            Campaigns::Description,
            Campaigns::System,
            Campaigns::TriggerWarnings,
            Campaigns::CreatedAt,
            Campaigns::UpdatedAt,
            Campaigns::NameKey,
        ]
    }

    fn values(&self) -> Vec<SimpleExpr> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.gm_id.clone().into(),
            self.description.clone().into(),
            self.system.clone().into(),
            json_text(&self.trigger_warnings),
            ts(self.created_at),
            ts(self.updated_at),
            Campaign::name_key(&self.name).into(),
        ]
    }

    fn order_by() -> (Campaigns, Order) {
        (Campaigns::CreatedAt, Order::Asc)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Campaign {
            id: row.get(0)?,
            name: row.get(1)?,
            gm_id: row.get(2)?,
            description: row.get(3)?,
            system: row.get(4)?,
            trigger_warnings: get_json(row, 5)?,
            created_at: get_ts(row, 6)?,
            updated_at: get_ts(row, 7)?,
        })
    }
}

// ── Registrations ──────────────────────────────────────────────────────────

impl SqlRecord for Registration {
    type Column = Registrations;

    fn table() -> Registrations {
        Registrations::Table
    }

    fn id_column() -> Registrations {
        Registrations::Id
    }

    fn columns() -> Vec<Registrations> {
        vec![
            Registrations::Id,
            Registrations::SessionId,
            Registrations::PlayerId,
            Registrations::CharacterId,
            Registrations::Status,
            Registrations::RegisteredAt,
        ]
    }

    fn values(&self) -> Vec<SimpleExpr> {
        vec![
            self.id.clone().into(),
            self.session_id.clone().into(),
            self.player_id.clone().into(),
            self.character_id.clone().into(),
            self.status.as_str().into(),
            ts(self.registered_at),
        ]
    }

    fn order_by() -> (Registrations, Order) {
        (Registrations::RegisteredAt, Order::Asc)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Registration {
            id: row.get(0)?,
            session_id: row.get(1)?,
            player_id: row.get(2)?,
            character_id: row.get(3)?,
            status: get_enum(row, 4, RegistrationStatus::parse)?,
            registered_at: get_ts(row, 5)?,
        })
    }
}

// ── Invitations ────────────────────────────────────────────────────────────

impl SqlRecord for Invitation {
    type Column = Invitations;

    fn table() -> Invitations {
        Invitations::Table
    }

    fn id_column() -> Invitations {
        Invitations::Id
    }

    fn columns() -> Vec<Invitations> {
        vec![
            Invitations::Id,
            Invitations::CampaignId,
            Invitations::SessionId,
            Invitations::InvitedBy,
            Invitations::InvitedPlayer,
            Invitations::Message,
            Invitations::Status,
            Invitations::CreatedAt,
            Invitations::RespondedAt,
        ]
    }

    fn values(&self) -> Vec<SimpleExpr> {
        vec![
            self.id.clone().into(),
            self.target.campaign_id().map(str::to_string).into(),
            self.target.session_id().map(str::to_string).into(),
            self.invited_by.clone().into(),
            self.invited_player.clone().into(),
            self.message.clone().into(),
            self.status.as_str().into(),
            ts(self.created_at),
            opt_ts(self.responded_at),
        ]
    }

    fn order_by() -> (Invitations, Order) {
        (Invitations::CreatedAt, Order::Asc)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let campaign_id: Option<String> = row.get(1)?;
        let session_id: Option<String> = row.get(2)?;
        let target = match (campaign_id, session_id) {
            (Some(campaign_id), None) => InvitationTarget::Campaign { campaign_id },
            (None, Some(session_id)) => InvitationTarget::Session { session_id },
            _ => {
                return Err(conversion_error(
                    1,
                    "invitation must target exactly one of campaign or session".into(),
                ));
            }
        };
        Ok(Invitation {
            id: row.get(0)?,
            target,
            invited_by: row.get(3)?,
            invited_player: row.get(4)?,
            message: row.get(5)?,
            status: get_enum(row, 6, InvitationStatus::parse)?,
            created_at: get_ts(row, 7)?,
            responded_at: get_opt_ts(row, 8)?,
        })
    }
}

// ── Event logs ─────────────────────────────────────────────────────────────

impl SqlRecord for EventLog {
    type Column = EventLogs;

    fn table() -> EventLogs {
        EventLogs::Table
    }

    fn id_column() -> EventLogs {
        EventLogs::Id
    }

    fn columns() -> Vec<EventLogs> {
        vec![
            EventLogs::Id,
            EventLogs::UserId,
            EventLogs::EventType,
            EventLogs::EntityType,
            EventLogs::EntityId,
            EventLogs::Details,
            EventLogs::CreatedAt,
        ]
    }

    fn values(&self) -> Vec<SimpleExpr> {
        vec![
            self.id.clone().into(),
            self.user_id.clone().into(),
            self.event_type.clone().into(),
            self.entity_type.clone().into(),
            self.entity_id.clone().into(),
            json_text(&self.details),
            ts(self.created_at),
        ]
    }

    fn order_by() -> (EventLogs, Order) {
        (EventLogs::CreatedAt, Order::Asc)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EventLog {
            id: row.get(0)?,
            user_id: row.get(1)?,
            event_type: row.get(2)?,
            entity_type: row.get(3)?,
            entity_id: row.get(4)?,
            details: get_json(row, 5)?,
            created_at: get_ts(row, 6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_are_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2030, 6, 1, 20, 0, 0).unwrap();
        assert_eq!(format_ts(whole), "2030-06-01T20:00:00.000000Z");
        let later = whole + chrono::Duration::microseconds(5);
        assert!(format_ts(whole) < format_ts(later));
    }
}
