//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Sessions {
    Table,
    Id,
    GameType,
    Title,
    Description,
    System,
    CampaignId,
    SessionNumber,
    DmId,
    StartsAt,
    EndsAt,
    MinPlayers,
    MaxPlayers,
    TriggerWarnings,
    ExternalUrl,
    Status,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Campaigns {
    Table,
    Id,
    Name,
    GmId,
    Description,
    System,
    TriggerWarnings,
    CreatedAt,
    UpdatedAt,
    NameKey,
}

#[derive(Iden, Clone, Copy)]
pub enum Registrations {
    Table,
    Id,
    SessionId,
    PlayerId,
    CharacterId,
    Status,
    RegisteredAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Invitations {
    Table,
    Id,
    CampaignId,
    SessionId,
    InvitedBy,
    InvitedPlayer,
    Message,
    Status,
    CreatedAt,
    RespondedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum EventLogs {
    Table,
    Id,
    UserId,
    EventType,
    EntityType,
    EntityId,
    Details,
    CreatedAt,
}
