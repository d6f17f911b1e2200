use std::sync::Arc;

use poise::serenity_prelude::{GuildId, UserId};
use serde_json::json;
use time::Date;
use tracing::{debug, info};

use crate::{
    models::{
        types::UtcDateTime, ComparisonMode, League, LeagueId, Member, MemberRole, NewLeague,
        RotationType, ScoringFormat,
    },
    repository::LeagueRepository,
    rules::{FixedPair, LeagueRules, Rules, APPROVAL_PATH, COMPARISON_MODE_PATH, DISTANCE_PATH},
    schedule::validate_fixed_pairs,
    utils::camel_slug::{is_valid_slug, slugify_camel},
};

use super::{load_league, require_admin, require_member, WorkflowError, WorkflowResult};

#[derive(Debug)]
pub struct CreateLeague {
    pub guild: GuildId,
    pub display_name: String,
    /// Derived from the display name when absent.
    pub slug: Option<String>,
    pub sport: String,
    pub scoring_format: ScoringFormat,
    pub rotation_type: RotationType,
    pub season_weeks: u32,
    pub start_date: Date,
    pub creator: UserId,
}

/// Running settings to change. `None` leaves the current value alone.
#[derive(Debug, Default)]
pub struct RunningRulesUpdate {
    pub require_approval: Option<bool>,
    pub comparison_mode: Option<ComparisonMode>,
    pub distance_m: Option<f64>,
}

pub struct LeagueService {
    leagues: Arc<LeagueRepository>,
}

impl LeagueService {
    pub fn new(leagues: Arc<LeagueRepository>) -> LeagueService {
        LeagueService { leagues }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_league(
        &self,
        request: CreateLeague,
        at: UtcDateTime,
    ) -> WorkflowResult<League> {
        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            return Err(WorkflowError::Validation(
                "The league name can't be empty".to_string(),
            ));
        }

        if request.season_weeks < 1 {
            return Err(WorkflowError::Validation(
                "The season must last at least one week".to_string(),
            ));
        }

        let slug = match request.slug {
            Some(slug) => slug,
            None => slugify_camel(display_name),
        };
        if !is_valid_slug(&slug) {
            return Err(WorkflowError::Validation(format!(
                "`{slug}` is not a valid league slug: use latin letters, digits, `_` and `-`"
            )));
        }

        if self
            .leagues
            .get_league_by_slug(request.guild, &slug)
            .await?
            .is_some()
        {
            debug!("League slug {slug} is taken in guild {}", request.guild);
            return Err(WorkflowError::Conflict(format!(
                "A league named `{slug}` already exists in this server"
            )));
        }

        let league = self
            .leagues
            .create_league(
                &NewLeague {
                    guild: request.guild,
                    slug,
                    display_name: display_name.to_string(),
                    sport: request.sport.trim().to_string(),
                    scoring_format: request.scoring_format,
                    rotation_type: request.rotation_type,
                    season_weeks: request.season_weeks,
                    start_date: request.start_date,
                    rules: Rules::default(),
                    created_by: request.creator,
                },
                at,
            )
            .await?;

        info!("Created league {} ({})", league.slug, league.id.0);

        Ok(league)
    }

    /// Returns `false` if the user was already a member.
    #[tracing::instrument(skip(self))]
    pub async fn join_league(
        &self,
        league_id: LeagueId,
        user: UserId,
        at: UtcDateTime,
    ) -> WorkflowResult<bool> {
        let league = load_league(&self.leagues, league_id).await?;

        let joined = self
            .leagues
            .add_member(league.id, user, MemberRole::Member, at)
            .await?;
        if joined {
            info!("User {user} joined league {}", league.slug);
        }

        Ok(joined)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_member_role(
        &self,
        league_id: LeagueId,
        caller: UserId,
        target: UserId,
        role: MemberRole,
    ) -> WorkflowResult<Member> {
        let league = load_league(&self.leagues, league_id).await?;

        let caller_member = require_member(&self.leagues, &league, caller).await?;
        if caller_member.role != MemberRole::Owner {
            return Err(WorkflowError::Unauthorized(format!(
                "Only the owner of {} can change roles",
                league.display_name
            )));
        }

        if role == MemberRole::Owner {
            return Err(WorkflowError::Validation(
                "The owner role can't be granted".to_string(),
            ));
        }

        let mut member = self
            .leagues
            .get_member(league.id, target)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!(
                    "<@{target}> is not a member of {}",
                    league.display_name
                ))
            })?;

        if member.role == MemberRole::Owner {
            return Err(WorkflowError::Validation(
                "The owner role can't be removed".to_string(),
            ));
        }

        self.leagues.set_member_role(league.id, target, role).await?;
        info!(
            "User {target} is now {role} of league {} (was {})",
            league.slug, member.role
        );

        member.role = role;
        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_fixed_pairs(
        &self,
        league_id: LeagueId,
        caller: UserId,
        pairs: Vec<FixedPair>,
    ) -> WorkflowResult<Vec<FixedPair>> {
        let league = load_league(&self.leagues, league_id).await?;
        require_admin(&self.leagues, &league, caller).await?;

        let roster: Vec<UserId> = self
            .leagues
            .list_members(league.id)
            .await?
            .into_iter()
            .map(|member| member.user_id)
            .collect();
        validate_fixed_pairs(&pairs, &roster)?;

        let mut rules = league.rules;
        rules.set_fixed_pairs(&pairs)?;
        self.leagues.update_rules(league.id, &rules).await?;

        info!("Stored {} fixed pairs for league {}", pairs.len(), league.slug);

        Ok(pairs)
    }

    /// Applies the update and returns the resulting typed rules. Nothing is stored if the
    /// updated rules don't resolve.
    #[tracing::instrument(skip(self))]
    pub async fn update_running_rules(
        &self,
        league_id: LeagueId,
        caller: UserId,
        update: RunningRulesUpdate,
    ) -> WorkflowResult<LeagueRules> {
        let league = load_league(&self.leagues, league_id).await?;
        require_admin(&self.leagues, &league, caller).await?;

        let mut rules = league.rules;
        if let Some(require_approval) = update.require_approval {
            rules.set_at(APPROVAL_PATH, json!(require_approval))?;
        }
        if let Some(mode) = update.comparison_mode {
            rules.set_at(COMPARISON_MODE_PATH, json!(mode.to_string()))?;
        }
        if let Some(distance) = update.distance_m {
            rules.set_at(DISTANCE_PATH, json!(distance))?;
        }

        let resolved = LeagueRules::resolve(&rules)?;
        self.leagues.update_rules(league.id, &rules).await?;

        info!("Updated running rules of league {}", league.slug);

        Ok(resolved)
    }

    pub async fn find_league(&self, guild: GuildId, slug: &str) -> WorkflowResult<League> {
        self.leagues
            .get_league_by_slug(guild, slug)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("There is no league named `{slug}`")))
    }

    pub async fn list_leagues(&self, guild: GuildId) -> WorkflowResult<Vec<League>> {
        Ok(self.leagues.list_leagues(guild).await?)
    }

    pub async fn list_members(&self, league_id: LeagueId) -> WorkflowResult<Vec<Member>> {
        Ok(self.leagues.list_members(league_id).await?)
    }
}
