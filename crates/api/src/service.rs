//! The scheduling service: session lifecycle, registrations, campaigns,
//! invitations and the audit log, over any [`EntityStore`].
//!
//! Route handlers stay thin adapters around [`Scheduler`]. Every mutating
//! operation runs its whole read/validate/write sequence while holding one
//! write gate, so capacity and conflict checks cannot race with another
//! writer. Readers do not take the gate.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jdrtables_core::conflict::{check_dm_conflict, check_player_conflict};
use jdrtables_core::lifecycle::{check_transition, duplicate_draft};
use jdrtables_core::validate::{
    MAX_NAME_LEN, SessionDraft, ValidationError, validate_draft, validate_label,
};
use jdrtables_core::{
    Actor, Campaign, EventLog, GameType, Invitation, InvitationStatus, InvitationTarget,
    Registration, RegistrationStatus, Session, SessionStatus, UserRole, archive,
    trigger_warnings,
};
use jdrtables_runtime_config::SchedulingSettings;
use jdrtables_store::EntityStore;
use serde_json::json;

use crate::audit::{
    AuditEvent, AuditSink, EventType, StoreAuditSink, TracingAuditSink, best_effort,
};
use crate::views::{Snapshot, partition_views};
use crate::{
    CreateCampaignRequest, CreateSessionRequest, EVENT_PAGE_LIMIT, EventQuery, InviteRequest,
    ScheduleCheckResponse, ScheduleSubject, ServiceError, SessionListResponse, SessionView,
    UpdateCampaignRequest, UpdateSessionRequest,
};

pub type Result<T> = std::result::Result<T, ServiceError>;

pub struct Scheduler<S> {
    store: Arc<S>,
    settings: SchedulingSettings,
    audit: Box<dyn AuditSink>,
    write_gate: Mutex<()>,
}

impl<S: EntityStore + 'static> Scheduler<S> {
    /// Scheduler whose audit events go to the store when `persist_audit` is
    /// set, and only to the tracing log otherwise.
    pub fn with_store_audit(store: Arc<S>, settings: SchedulingSettings, persist_audit: bool) -> Self {
        let audit: Box<dyn AuditSink> = if persist_audit {
            Box::new(StoreAuditSink::new(store.clone()))
        } else {
            Box::new(TracingAuditSink)
        };
        Self::new(store, settings, audit)
    }
}

impl<S: EntityStore> Scheduler<S> {
    pub fn new(store: Arc<S>, settings: SchedulingSettings, audit: Box<dyn AuditSink>) -> Self {
        Self {
            store,
            settings,
            audit,
            write_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SchedulingSettings {
        &self.settings
    }

    // ── Plumbing ────────────────────────────────────────────────────────────

    /// The gate guards no data, so a poisoned lock is still usable.
    fn gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Stored timestamps carry microsecond precision.
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    fn audit(&self, event: AuditEvent) {
        best_effort("audit log", self.audit.record(event, self.now()));
    }

    fn session_any(&self, id: &str) -> Result<Session> {
        self.store
            .get_by_id::<Session>(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("session not found: {id}")))
    }

    /// Soft-deleted sessions are reported as missing.
    fn live_session(&self, id: &str) -> Result<Session> {
        let session = self.session_any(id)?;
        if session.is_deleted() {
            return Err(ServiceError::NotFound(format!("session not found: {id}")));
        }
        Ok(session)
    }

    fn campaign(&self, id: &str) -> Result<Campaign> {
        self.store
            .get_by_id::<Campaign>(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("campaign not found: {id}")))
    }

    fn view(&self, session: Session) -> Result<SessionView> {
        let registrations: Vec<Registration> = self.store.get_all()?;
        let campaigns: Vec<Campaign> = self.store.get_all()?;
        Ok(Snapshot::new(&registrations, &campaigns).view(session))
    }

    fn require_game_master(actor: &Actor, action: &str) -> Result<()> {
        match actor.role {
            UserRole::GameMaster | UserRole::Admin => Ok(()),
            UserRole::Player => Err(ServiceError::Forbidden(format!(
                "only game masters can {action}"
            ))),
        }
    }

    fn require_owner(actor: &Actor, owner_id: &str, what: &str) -> Result<()> {
        if actor.can_manage(owner_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!("you do not manage this {what}")))
        }
    }

    /// A campaign session must point at an existing campaign run by its GM.
    fn check_campaign_link(&self, campaign_id: &str, dm_id: &str) -> Result<()> {
        let campaign = self
            .store
            .get_by_id::<Campaign>(campaign_id)?
            .ok_or_else(|| ServiceError::Validation(format!("unknown campaign: {campaign_id}")))?;
        if campaign.gm_id != dm_id {
            return Err(ServiceError::Forbidden(
                "only the campaign's game master can schedule its sessions".into(),
            ));
        }
        Ok(())
    }

    fn check_dm_free(
        &self,
        dm_id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<&str>,
    ) -> Result<()> {
        let sessions: Vec<Session> = self.store.get_all()?;
        match check_dm_conflict(&sessions, dm_id, starts_at, ends_at, exclude) {
            Some(other) => Err(ServiceError::ScheduleConflict(format!(
                "game master already runs \"{}\" at that time",
                other.title
            ))),
            None => Ok(()),
        }
    }

    fn player_busy(player_id: &str, other: &Session) -> ServiceError {
        ServiceError::ScheduleConflict(format!(
            "{player_id} is already playing \"{}\" at that time",
            other.title
        ))
    }

    /// Every confirmed player of `session_id` must be free over the window,
    /// counting every session but this one.
    fn check_players_free(
        &self,
        session_id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<()> {
        let registrations: Vec<Registration> = self.store.get_all()?;
        let sessions: Vec<Session> = self.store.get_all()?;
        let seated = registrations
            .iter()
            .filter(|r| r.session_id == session_id && r.is_confirmed());
        for seat in seated {
            if let Some(other) = check_player_conflict(
                &registrations,
                &sessions,
                &seat.player_id,
                starts_at,
                ends_at,
                Some(session_id),
            ) {
                return Err(Self::player_busy(&seat.player_id, other));
            }
        }
        Ok(())
    }

    /// Read-only look at a calendar: what, if anything, already occupies
    /// `[starts_at, ends_at)` for this game master or player.
    pub fn check_schedule(
        &self,
        subject: ScheduleSubject,
        user_id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude_session_id: Option<&str>,
    ) -> Result<ScheduleCheckResponse> {
        if ends_at <= starts_at {
            return Err(ValidationError::InvalidTimeWindow.into());
        }
        let sessions: Vec<Session> = self.store.get_all()?;
        let conflict = match subject {
            ScheduleSubject::GameMaster => {
                check_dm_conflict(&sessions, user_id, starts_at, ends_at, exclude_session_id)
            }
            ScheduleSubject::Player => {
                let registrations: Vec<Registration> = self.store.get_all()?;
                check_player_conflict(
                    &registrations,
                    &sessions,
                    user_id,
                    starts_at,
                    ends_at,
                    exclude_session_id,
                )
            }
        };
        Ok(ScheduleCheckResponse {
            has_conflict: conflict.is_some(),
            conflict_session: conflict.cloned(),
        })
    }

    // ── Campaigns ───────────────────────────────────────────────────────────

    fn check_name_free(&self, gm_id: &str, name: &str, exclude: Option<&str>) -> Result<()> {
        let campaigns: Vec<Campaign> = self.store.get_all()?;
        let wanted = Campaign::name_key(name);
        let taken = campaigns.iter().any(|c| {
            c.gm_id == gm_id
                && Some(c.id.as_str()) != exclude
                && Campaign::name_key(&c.name) == wanted
        });
        if taken {
            return Err(ServiceError::NameTaken(format!(
                "you already have a campaign named \"{name}\""
            )));
        }
        Ok(())
    }

    pub fn create_campaign(&self, actor: &Actor, req: CreateCampaignRequest) -> Result<Campaign> {
        Self::require_game_master(actor, "create campaigns")?;
        let name = validate_label("name", &req.name, MAX_NAME_LEN)?;
        let trigger_warnings = trigger_warnings::normalize(&req.trigger_warnings)?;

        let _gate = self.gate();
        self.check_name_free(&actor.user_id, &name, None)?;

        let now = self.now();
        let campaign = self.store.create(Campaign {
            id: jdrtables_core::new_id(),
            name,
            gm_id: actor.user_id.clone(),
            description: req.description.trim().to_string(),
            system: req.system.trim().to_string(),
            trigger_warnings,
            created_at: now,
            updated_at: now,
        })?;
        tracing::info!("campaign created: {} by {}", campaign.id, actor.user_id);
        self.audit(
            AuditEvent::new(EventType::CampaignCreated, actor)
                .entity("campaign", &campaign.id)
                .details(json!({ "name": campaign.name })),
        );
        Ok(campaign)
    }

    pub fn update_campaign(
        &self,
        actor: &Actor,
        id: &str,
        req: UpdateCampaignRequest,
    ) -> Result<Campaign> {
        let _gate = self.gate();
        let mut campaign = self.campaign(id)?;
        Self::require_owner(actor, &campaign.gm_id, "campaign")?;

        if let Some(name) = req.name {
            let name = validate_label("name", &name, MAX_NAME_LEN)?;
            self.check_name_free(&campaign.gm_id, &name, Some(id))?;
            campaign.name = name;
        }
        if let Some(description) = req.description {
            campaign.description = description.trim().to_string();
        }
        if let Some(system) = req.system {
            campaign.system = system.trim().to_string();
        }
        if let Some(tags) = req.trigger_warnings {
            campaign.trigger_warnings = trigger_warnings::normalize(&tags)?;
        }
        campaign.updated_at = self.now();

        let campaign = self.store.update(campaign)?;
        self.audit(
            AuditEvent::new(EventType::CampaignUpdated, actor).entity("campaign", &campaign.id),
        );
        Ok(campaign)
    }

    /// Sessions that referenced the campaign are left in place with a
    /// dangling `campaign_id`.
    pub fn delete_campaign(&self, actor: &Actor, id: &str) -> Result<()> {
        let _gate = self.gate();
        let campaign = self.campaign(id)?;
        Self::require_owner(actor, &campaign.gm_id, "campaign")?;
        self.store.delete::<Campaign>(id)?;
        tracing::info!("campaign deleted: {id}");
        self.audit(
            AuditEvent::new(EventType::CampaignDeleted, actor)
                .entity("campaign", id)
                .details(json!({ "name": campaign.name })),
        );
        Ok(())
    }

    pub fn get_campaign(&self, id: &str) -> Result<Campaign> {
        self.campaign(id)
    }

    /// Newest first.
    pub fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = self.store.get_all()?;
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    // ── Session lifecycle ───────────────────────────────────────────────────

    pub fn create_session(&self, actor: &Actor, req: CreateSessionRequest) -> Result<SessionView> {
        Self::require_game_master(actor, "create sessions")?;

        let ends_at = req.ends_at.unwrap_or_else(|| {
            req.starts_at + Duration::hours(i64::from(self.settings.default_session_hours))
        });
        let draft = SessionDraft {
            game_type: req.game_type,
            title: req.title,
            description: req.description,
            system: req.system,
            campaign_id: req.campaign_id,
            session_number: req.session_number.unwrap_or(match req.game_type {
                GameType::Campaign => 1,
                GameType::Oneshot => 0,
            }),
            starts_at: req.starts_at,
            ends_at,
            min_players: req
                .min_players
                .unwrap_or(i64::from(self.settings.default_min_players)),
            max_players: req
                .max_players
                .unwrap_or(i64::from(self.settings.default_max_players)),
            trigger_warnings: req.trigger_warnings,
            external_url: req.external_url,
        };
        let valid = validate_draft(&draft)?;

        let mut seen = HashSet::new();
        let mut players: Vec<String> = Vec::new();
        for player in &req.preregistered_players {
            let player = player.trim();
            if player.is_empty() {
                continue;
            }
            if !seen.insert(player.to_string()) {
                return Err(ServiceError::Validation(format!(
                    "player {player} is listed twice"
                )));
            }
            players.push(player.to_string());
        }
        if players.len() > valid.max_players as usize {
            return Err(ServiceError::Full(format!(
                "{} players listed for {} seats",
                players.len(),
                valid.max_players
            )));
        }

        let _gate = self.gate();
        let dm_id = actor.user_id.clone();
        if let Some(campaign_id) = valid.campaign_id.as_deref() {
            self.check_campaign_link(campaign_id, &dm_id)?;
        }
        self.check_dm_free(&dm_id, valid.starts_at, valid.ends_at, None)?;

        let sessions: Vec<Session> = self.store.get_all()?;
        let registrations: Vec<Registration> = self.store.get_all()?;
        for player in &players {
            if let Some(other) = check_player_conflict(
                &registrations,
                &sessions,
                player,
                valid.starts_at,
                valid.ends_at,
                None,
            ) {
                return Err(Self::player_busy(player, other));
            }
        }

        let now = self.now();
        let session = self.store.transaction(|tx| {
            let session = tx.create(valid.into_session(jdrtables_core::new_id(), dm_id, now))?;
            for player in &players {
                tx.create(Registration {
                    id: jdrtables_core::new_id(),
                    session_id: session.id.clone(),
                    player_id: player.clone(),
                    character_id: None,
                    status: RegistrationStatus::Confirmed,
                    registered_at: now,
                })?;
            }
            Ok(session)
        })?;
        for player in players {
            self.audit(
                AuditEvent::new(EventType::PlayerPreregistered, actor)
                    .entity("session", &session.id)
                    .details(json!({ "player_id": player })),
            );
        }

        tracing::info!("session created: {} ({})", session.id, session.title);
        self.audit(
            AuditEvent::new(EventType::SessionCreated, actor)
                .entity("session", &session.id)
                .details(json!({
                    "title": session.title,
                    "starts_at": session.starts_at,
                    "game_type": session.game_type,
                })),
        );
        self.view(session)
    }

    pub fn update_session(
        &self,
        actor: &Actor,
        id: &str,
        req: UpdateSessionRequest,
    ) -> Result<SessionView> {
        let _gate = self.gate();
        let mut session = self.live_session(id)?;
        Self::require_owner(actor, &session.dm_id, "session")?;

        let mut draft = SessionDraft::from_session(&session);
        if let Some(game_type) = req.game_type {
            draft.game_type = game_type;
        }
        if let Some(title) = req.title {
            draft.title = title;
        }
        if let Some(description) = req.description {
            draft.description = description;
        }
        if let Some(system) = req.system {
            draft.system = system;
        }
        if let Some(campaign_id) = req.campaign_id {
            draft.campaign_id = Some(campaign_id);
        }
        if let Some(number) = req.session_number {
            draft.session_number = number;
        }
        if let Some(starts_at) = req.starts_at {
            draft.starts_at = starts_at;
        }
        if let Some(ends_at) = req.ends_at {
            draft.ends_at = ends_at;
        }
        if let Some(min) = req.min_players {
            draft.min_players = min;
        }
        if let Some(max) = req.max_players {
            draft.max_players = max;
        }
        if let Some(tags) = req.trigger_warnings {
            draft.trigger_warnings = tags;
        }
        if let Some(url) = req.external_url {
            draft.external_url = Some(url);
        }
        let valid = validate_draft(&draft)?;

        let status = req.status.unwrap_or(session.status);
        check_transition(session.status, status)?;

        let relinked =
            valid.game_type != session.game_type || valid.campaign_id != session.campaign_id;
        if relinked {
            if let Some(campaign_id) = valid.campaign_id.as_deref() {
                self.check_campaign_link(campaign_id, &session.dm_id)?;
            }
        }

        let registrations: Vec<Registration> = self.store.get_all()?;
        let confirmed = registrations
            .iter()
            .filter(|r| r.session_id == session.id && r.is_confirmed())
            .count();
        if (valid.max_players as usize) < confirmed {
            return Err(ValidationError::CapacityBelowRegistrations {
                max: valid.max_players,
                current: confirmed,
            }
            .into());
        }

        let retimed = valid.starts_at != session.starts_at || valid.ends_at != session.ends_at;
        if retimed && status != SessionStatus::Cancelled {
            self.check_dm_free(&session.dm_id, valid.starts_at, valid.ends_at, Some(id))?;
            self.check_players_free(id, valid.starts_at, valid.ends_at)?;
        }

        let previous_status = session.status;
        valid.apply_to(&mut session, self.now());
        session.status = status;
        let session = self.store.update(session)?;

        if previous_status != status {
            tracing::info!("session {id}: {previous_status} -> {status}");
        }
        self.audit(
            AuditEvent::new(EventType::SessionUpdated, actor)
                .entity("session", id)
                .details(json!({ "status": status, "retimed": retimed })),
        );
        self.view(session)
    }

    /// Hide a session from listings and conflict checks. Idempotent.
    pub fn soft_delete(&self, actor: &Actor, id: &str) -> Result<Session> {
        let _gate = self.gate();
        let mut session = self.session_any(id)?;
        Self::require_owner(actor, &session.dm_id, "session")?;
        if session.is_deleted() {
            return Ok(session);
        }

        let now = self.now();
        session.deleted_at = Some(now);
        session.updated_at = now;
        let session = self.store.update(session)?;
        tracing::info!("session soft-deleted: {id}");
        self.audit(AuditEvent::new(EventType::SessionSoftDeleted, actor).entity("session", id));
        Ok(session)
    }

    /// Undo a soft delete. Restoring an active session is a no-op. The
    /// session's slot must still be free for its GM and for every player
    /// still seated in it.
    pub fn restore(&self, actor: &Actor, id: &str) -> Result<SessionView> {
        let _gate = self.gate();
        let mut session = self.session_any(id)?;
        Self::require_owner(actor, &session.dm_id, "session")?;
        if !session.is_deleted() {
            return self.view(session);
        }
        if !session.is_cancelled() {
            self.check_dm_free(&session.dm_id, session.starts_at, session.ends_at, Some(id))?;
            self.check_players_free(id, session.starts_at, session.ends_at)?;
        }

        session.deleted_at = None;
        session.updated_at = self.now();
        let session = self.store.update(session)?;
        tracing::info!("session restored: {id}");
        self.audit(AuditEvent::new(EventType::SessionRestored, actor).entity("session", id));
        self.view(session)
    }

    /// Erase a soft-deleted session with its registrations and invitations.
    pub fn permanent_delete(&self, actor: &Actor, id: &str) -> Result<()> {
        let _gate = self.gate();
        let session = self.session_any(id)?;
        Self::require_owner(actor, &session.dm_id, "session")?;
        if !session.is_deleted() {
            return Err(ServiceError::InvalidState(
                "only soft-deleted sessions can be permanently deleted".into(),
            ));
        }

        let removed_registrations = self.store.transaction(|tx| {
            let registrations: Vec<Registration> = tx.get_all()?;
            let mut removed = 0usize;
            for r in registrations.iter().filter(|r| r.session_id == id) {
                tx.delete::<Registration>(&r.id)?;
                removed += 1;
            }
            let invitations: Vec<Invitation> = tx.get_all()?;
            for inv in invitations.iter().filter(|i| i.target.session_id() == Some(id)) {
                tx.delete::<Invitation>(&inv.id)?;
            }
            tx.delete::<Session>(id)?;
            Ok(removed)
        })?;

        tracing::info!("session permanently deleted: {id}");
        self.audit(
            AuditEvent::new(EventType::SessionPermanentlyDeleted, actor)
                .entity("session", id)
                .details(json!({
                    "title": session.title,
                    "registrations": removed_registrations,
                })),
        );
        Ok(())
    }

    /// Schedule the next episode: same metadata, number + 1, moved forward by
    /// the configured offset, no registrations.
    pub fn duplicate(&self, actor: &Actor, id: &str) -> Result<SessionView> {
        let _gate = self.gate();
        let source = self.live_session(id)?;
        Self::require_owner(actor, &source.dm_id, "session")?;

        let offset = Duration::days(i64::from(self.settings.duplicate_offset_days));
        let valid = validate_draft(&duplicate_draft(&source, offset))?;
        // A link left dangling by a deleted campaign is copied as is.
        if let Some(campaign_id) = valid.campaign_id.as_deref() {
            if self.store.get_by_id::<Campaign>(campaign_id)?.is_some() {
                self.check_campaign_link(campaign_id, &source.dm_id)?;
            }
        }
        self.check_dm_free(&source.dm_id, valid.starts_at, valid.ends_at, None)?;

        let copy = self.store.create(valid.into_session(
            jdrtables_core::new_id(),
            source.dm_id.clone(),
            self.now(),
        ))?;
        tracing::info!("session duplicated: {id} -> {}", copy.id);
        self.audit(
            AuditEvent::new(EventType::SessionDuplicated, actor)
                .entity("session", &copy.id)
                .details(json!({ "source_id": id })),
        );
        self.view(copy)
    }

    /// Persist `completed` for every live session that has ended. Returns
    /// how many were changed.
    pub fn archive_sweep(&self, actor: &Actor, now: DateTime<Utc>) -> Result<u32> {
        Self::require_game_master(actor, "archive sessions")?;
        let _gate = self.gate();
        let sessions: Vec<Session> = self.store.get_all()?;
        let mut count = 0u32;
        for mut session in sessions
            .into_iter()
            .filter(|s| archive::needs_completion(s, now))
        {
            session.status = SessionStatus::Completed;
            session.updated_at = self.now();
            self.store.update(session)?;
            count += 1;
        }
        if count > 0 {
            tracing::info!("archived {count} sessions");
            self.audit(
                AuditEvent::new(EventType::SessionsArchived, actor)
                    .details(json!({ "count": count })),
            );
        }
        Ok(count)
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    fn partitioned(&self, now: DateTime<Utc>) -> Result<archive::Partition<SessionView>> {
        let sessions: Vec<Session> = self.store.get_all()?;
        let registrations: Vec<Registration> = self.store.get_all()?;
        let campaigns: Vec<Campaign> = self.store.get_all()?;
        let snapshot = Snapshot::new(&registrations, &campaigns);
        Ok(partition_views(sessions, &snapshot, now))
    }

    pub fn list_sessions(&self, now: DateTime<Utc>) -> Result<SessionListResponse> {
        let partition = self.partitioned(now)?;
        Ok(SessionListResponse {
            active: partition.active,
            archived: partition.archived,
        })
    }

    pub fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<SessionView>> {
        Ok(self.partitioned(now)?.active)
    }

    pub fn list_archived(&self, now: DateTime<Utc>) -> Result<Vec<SessionView>> {
        Ok(self.partitioned(now)?.archived)
    }

    pub fn list_deleted(&self) -> Result<Vec<SessionView>> {
        Ok(self.partitioned(self.now())?.deleted)
    }

    /// Active, still `scheduled`, with at least one free seat.
    pub fn list_available(&self, now: DateTime<Utc>) -> Result<Vec<SessionView>> {
        Ok(self
            .partitioned(now)?
            .active
            .into_iter()
            .filter(|v| v.session.status == SessionStatus::Scheduled && v.available_slots > 0)
            .collect())
    }

    pub fn get_session(&self, id: &str) -> Result<SessionView> {
        let session = self.live_session(id)?;
        self.view(session)
    }

    // ── Registrations ───────────────────────────────────────────────────────

    /// The join rules, checked in order. Caller holds the write gate.
    fn seat_player(
        &self,
        actor: &Actor,
        session_id: &str,
        player_id: &str,
        character_id: Option<String>,
        event: EventType,
    ) -> Result<SessionView> {
        let session = self.live_session(session_id)?;
        match session.status {
            SessionStatus::Cancelled => {
                return Err(ServiceError::InvalidState("session is cancelled".into()));
            }
            SessionStatus::Completed => {
                return Err(ServiceError::InvalidState("session is already over".into()));
            }
            SessionStatus::Scheduled | SessionStatus::InProgress => {}
        }

        let registrations: Vec<Registration> = self.store.get_all()?;
        if registrations
            .iter()
            .any(|r| r.session_id == session_id && r.player_id == player_id)
        {
            return Err(ServiceError::AlreadyRegistered(format!(
                "{player_id} is already registered for this session"
            )));
        }

        let confirmed = registrations
            .iter()
            .filter(|r| r.session_id == session_id && r.is_confirmed())
            .count();
        if confirmed >= session.max_players as usize {
            return Err(ServiceError::Full("session is full".into()));
        }

        let sessions: Vec<Session> = self.store.get_all()?;
        if let Some(other) = check_player_conflict(
            &registrations,
            &sessions,
            player_id,
            session.starts_at,
            session.ends_at,
            Some(session_id),
        ) {
            return Err(Self::player_busy(player_id, other));
        }

        self.store.create(Registration {
            id: jdrtables_core::new_id(),
            session_id: session_id.to_string(),
            player_id: player_id.to_string(),
            character_id,
            status: RegistrationStatus::Confirmed,
            registered_at: self.now(),
        })?;
        self.audit(
            AuditEvent::new(event, actor)
                .entity("session", session_id)
                .details(json!({ "player_id": player_id })),
        );
        self.view(session)
    }

    /// The actor takes a seat.
    pub fn join(
        &self,
        actor: &Actor,
        session_id: &str,
        character_id: Option<String>,
    ) -> Result<SessionView> {
        let _gate = self.gate();
        self.seat_player(
            actor,
            session_id,
            &actor.user_id,
            character_id,
            EventType::RegistrationCreated,
        )
    }

    /// The session's GM seats a player, under the same rules as `join`.
    pub fn register_player(
        &self,
        actor: &Actor,
        session_id: &str,
        player_id: &str,
        character_id: Option<String>,
    ) -> Result<SessionView> {
        let _gate = self.gate();
        let session = self.live_session(session_id)?;
        Self::require_owner(actor, &session.dm_id, "session")?;
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(ValidationError::MissingField {
                field: "player_id".into(),
            }
            .into());
        }
        self.seat_player(
            actor,
            session_id,
            player_id,
            character_id,
            EventType::PlayerPreregistered,
        )
    }

    /// Returns whether a registration was removed. Removing an absent one is
    /// not an error. Caller holds the write gate.
    fn unseat_player(&self, session_id: &str, player_id: &str) -> Result<bool> {
        let registrations: Vec<Registration> = self.store.get_all()?;
        let Some(existing) = registrations
            .into_iter()
            .find(|r| r.session_id == session_id && r.player_id == player_id)
        else {
            return Ok(false);
        };
        self.store.delete::<Registration>(&existing.id)?;
        Ok(true)
    }

    /// The actor gives up their seat. Idempotent.
    pub fn leave(&self, actor: &Actor, session_id: &str) -> Result<SessionView> {
        let _gate = self.gate();
        let session = self.live_session(session_id)?;
        if self.unseat_player(session_id, &actor.user_id)? {
            self.audit(
                AuditEvent::new(EventType::RegistrationCancelled, actor)
                    .entity("session", session_id)
                    .details(json!({ "player_id": actor.user_id })),
            );
        }
        self.view(session)
    }

    /// The session's GM (or an admin) removes a player. Idempotent.
    pub fn remove_player(
        &self,
        actor: &Actor,
        session_id: &str,
        player_id: &str,
    ) -> Result<SessionView> {
        let _gate = self.gate();
        let session = self.live_session(session_id)?;
        Self::require_owner(actor, &session.dm_id, "session")?;
        if self.unseat_player(session_id, player_id)? {
            self.audit(
                AuditEvent::new(EventType::PlayerRemoved, actor)
                    .entity("session", session_id)
                    .details(json!({ "player_id": player_id })),
            );
        }
        self.view(session)
    }

    pub fn list_registrations(&self, session_id: &str) -> Result<Vec<Registration>> {
        self.live_session(session_id)?;
        let registrations: Vec<Registration> = self.store.get_all()?;
        Ok(registrations
            .into_iter()
            .filter(|r| r.session_id == session_id)
            .collect())
    }

    pub fn list_player_registrations(&self, player_id: &str) -> Result<Vec<Registration>> {
        let registrations: Vec<Registration> = self.store.get_all()?;
        Ok(registrations
            .into_iter()
            .filter(|r| r.player_id == player_id)
            .collect())
    }

    // ── Invitations ─────────────────────────────────────────────────────────

    pub fn invite(&self, actor: &Actor, req: InviteRequest) -> Result<Invitation> {
        let target = req.target()?;
        let invited_player = req.invited_player.trim().to_string();
        if invited_player.is_empty() {
            return Err(ValidationError::MissingField {
                field: "invited_player".into(),
            }
            .into());
        }
        if invited_player == actor.user_id {
            return Err(ServiceError::Validation("you cannot invite yourself".into()));
        }

        let _gate = self.gate();
        match &target {
            InvitationTarget::Campaign { campaign_id } => {
                let campaign = self.campaign(campaign_id)?;
                Self::require_owner(actor, &campaign.gm_id, "campaign")?;
            }
            InvitationTarget::Session { session_id } => {
                let session = self.live_session(session_id)?;
                Self::require_owner(actor, &session.dm_id, "session")?;
            }
        }

        let invitations: Vec<Invitation> = self.store.get_all()?;
        let pending = invitations.iter().any(|i| {
            i.status == InvitationStatus::Pending
                && i.target == target
                && i.invited_player == invited_player
        });
        if pending {
            return Err(ServiceError::DuplicatePending(format!(
                "{invited_player} already has a pending invitation"
            )));
        }

        let invitation = self.store.create(Invitation {
            id: jdrtables_core::new_id(),
            target,
            invited_by: actor.user_id.clone(),
            invited_player,
            message: req.message.trim().to_string(),
            status: InvitationStatus::Pending,
            created_at: self.now(),
            responded_at: None,
        })?;
        self.audit(
            AuditEvent::new(EventType::InvitationSent, actor)
                .entity("invitation", &invitation.id)
                .details(json!({ "invited_player": invitation.invited_player })),
        );
        Ok(invitation)
    }

    /// Accept or decline. Accepting a session invitation also tries to seat
    /// the player; if that fails the invitation is still accepted.
    pub fn respond(&self, actor: &Actor, id: &str, accept: bool) -> Result<Invitation> {
        let _gate = self.gate();
        let mut invitation = self
            .store
            .get_by_id::<Invitation>(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("invitation not found: {id}")))?;
        if invitation.invited_player != actor.user_id {
            return Err(ServiceError::Forbidden(
                "this invitation is addressed to someone else".into(),
            ));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "invitation already {}",
                invitation.status
            )));
        }

        invitation.status = if accept {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Declined
        };
        invitation.responded_at = Some(self.now());
        let invitation = self.store.update(invitation)?;

        if accept {
            if let Some(session_id) = invitation.target.session_id() {
                best_effort(
                    "auto-registration",
                    self.seat_player(
                        actor,
                        session_id,
                        &actor.user_id,
                        None,
                        EventType::RegistrationCreated,
                    ),
                );
            }
        }
        self.audit(
            AuditEvent::new(EventType::InvitationResponded, actor)
                .entity("invitation", id)
                .details(json!({ "status": invitation.status })),
        );
        Ok(invitation)
    }

    /// Newest first.
    pub fn list_my_invitations(&self, actor: &Actor) -> Result<Vec<Invitation>> {
        let invitations: Vec<Invitation> = self.store.get_all()?;
        let mut mine: Vec<Invitation> = invitations
            .into_iter()
            .filter(|i| i.invited_player == actor.user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    // ── Audit log ───────────────────────────────────────────────────────────

    /// Newest first, at most [`EVENT_PAGE_LIMIT`] entries. Admins only.
    pub fn list_events(&self, actor: &Actor, query: &EventQuery) -> Result<Vec<EventLog>> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden("admin only".into()));
        }
        let limit = query.limit.unwrap_or(EVENT_PAGE_LIMIT).min(EVENT_PAGE_LIMIT) as usize;
        let mut events: Vec<EventLog> = self.store.get_all()?;
        events.retain(|e| {
            query.event_type.as_ref().is_none_or(|t| &e.event_type == t)
                && query
                    .user_id
                    .as_ref()
                    .is_none_or(|u| e.user_id.as_ref() == Some(u))
                && query
                    .entity_type
                    .as_ref()
                    .is_none_or(|t| e.entity_type.as_ref() == Some(t))
        });
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }
}
