//! Membership rules of a game session.
//!
//! Every participant holds at least one role, the owner is always a participant and the
//! player list never grows beyond `max_players`. All functions mutate the entity in place
//! and leave it untouched when they return an error.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{GameSessionEntity, MemberRole},
    error::ServiceError,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("a participant needs at least one role")]
    NoRoles,
    #[error("user `{0}` is not a participant of this session")]
    NotParticipant(Uuid),
    #[error("user `{0}` already takes part in this session")]
    AlreadyParticipant(Uuid),
    #[error("session is full ({max} players)")]
    SessionFull { max: u32 },
    #[error("the owner must transfer ownership before leaving")]
    OwnerMustTransfer,
    #[error("the owner cannot be removed from the session")]
    OwnerNotRemovable,
    #[error("only the owner or a host may manage this session")]
    NotManager,
    #[error("only the owner may do this")]
    NotOwner,
}

impl From<RoleError> for ServiceError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::NoRoles => ServiceError::InvalidInput(err.to_string()),
            RoleError::NotParticipant(_) => ServiceError::NotFound(err.to_string()),
            RoleError::AlreadyParticipant(_)
            | RoleError::SessionFull { .. }
            | RoleError::OwnerMustTransfer
            | RoleError::OwnerNotRemovable => ServiceError::Conflict(err.to_string()),
            RoleError::NotManager | RoleError::NotOwner => ServiceError::Forbidden(err.to_string()),
        }
    }
}

/// Roles `user` holds, in [`MemberRole::ALL`] order.
pub fn roles_of(session: &GameSessionEntity, user: Uuid) -> Vec<MemberRole> {
    MemberRole::ALL
        .into_iter()
        .filter(|role| session.members(*role).contains(&user))
        .collect()
}

pub fn is_participant(session: &GameSessionEntity, user: Uuid) -> bool {
    !roles_of(session, user).is_empty()
}

pub fn ensure_owner(session: &GameSessionEntity, actor: Uuid) -> Result<(), RoleError> {
    if session.owner == actor {
        Ok(())
    } else {
        Err(RoleError::NotOwner)
    }
}

/// The owner and hosts may edit a session and manage its participants.
pub fn ensure_manager(session: &GameSessionEntity, actor: Uuid) -> Result<(), RoleError> {
    if session.owner == actor || session.hosts.contains(&actor) {
        Ok(())
    } else {
        Err(RoleError::NotManager)
    }
}

fn ensure_player_slot(session: &GameSessionEntity) -> Result<(), RoleError> {
    match session.max_players {
        Some(max) if session.players.len() >= max as usize => Err(RoleError::SessionFull { max }),
        _ => Ok(()),
    }
}

fn dedup_roles(roles: &[MemberRole]) -> Result<Vec<MemberRole>, RoleError> {
    let wanted: Vec<MemberRole> = MemberRole::ALL
        .into_iter()
        .filter(|role| roles.contains(role))
        .collect();
    if wanted.is_empty() {
        return Err(RoleError::NoRoles);
    }
    Ok(wanted)
}

/// Caller joins as a player.
pub fn join(session: &mut GameSessionEntity, user: Uuid) -> Result<(), RoleError> {
    if is_participant(session, user) {
        return Err(RoleError::AlreadyParticipant(user));
    }
    ensure_player_slot(session)?;
    session.players.push(user);
    Ok(())
}

/// Caller drops every role.
pub fn leave(session: &mut GameSessionEntity, user: Uuid) -> Result<(), RoleError> {
    if session.owner == user {
        return Err(RoleError::OwnerMustTransfer);
    }
    if !is_participant(session, user) {
        return Err(RoleError::NotParticipant(user));
    }
    for role in MemberRole::ALL {
        session.members_mut(role).retain(|member| *member != user);
    }
    Ok(())
}

pub fn add_participant(
    session: &mut GameSessionEntity,
    user: Uuid,
    roles: &[MemberRole],
) -> Result<(), RoleError> {
    let roles = dedup_roles(roles)?;
    if is_participant(session, user) {
        return Err(RoleError::AlreadyParticipant(user));
    }
    if roles.contains(&MemberRole::Player) {
        ensure_player_slot(session)?;
    }
    for role in roles {
        session.members_mut(role).push(user);
    }
    Ok(())
}

/// Replace the roles of an existing participant.
pub fn set_roles(
    session: &mut GameSessionEntity,
    user: Uuid,
    roles: &[MemberRole],
) -> Result<(), RoleError> {
    let roles = dedup_roles(roles)?;
    let current = roles_of(session, user);
    if current.is_empty() {
        return Err(RoleError::NotParticipant(user));
    }
    if roles.contains(&MemberRole::Player) && !current.contains(&MemberRole::Player) {
        ensure_player_slot(session)?;
    }

    for role in MemberRole::ALL {
        let members = session.members_mut(role);
        let wanted = roles.contains(&role);
        let present = members.contains(&user);
        if wanted && !present {
            members.push(user);
        } else if !wanted && present {
            members.retain(|member| *member != user);
        }
    }
    Ok(())
}

pub fn remove_participant(session: &mut GameSessionEntity, user: Uuid) -> Result<(), RoleError> {
    if session.owner == user {
        return Err(RoleError::OwnerNotRemovable);
    }
    if !is_participant(session, user) {
        return Err(RoleError::NotParticipant(user));
    }
    for role in MemberRole::ALL {
        session.members_mut(role).retain(|member| *member != user);
    }
    Ok(())
}

pub fn transfer_ownership(session: &mut GameSessionEntity, target: Uuid) -> Result<(), RoleError> {
    if !is_participant(session, target) {
        return Err(RoleError::NotParticipant(target));
    }
    session.owner = target;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn session(owner: Uuid, max_players: Option<u32>) -> GameSessionEntity {
        let now = SystemTime::now();
        GameSessionEntity {
            id: Uuid::new_v4(),
            title: "Azul".into(),
            location: Some("Library".into()),
            scheduled_time: None,
            catalog_id: "230802".into(),
            min_players: Some(2),
            max_players,
            creator: owner,
            owner,
            hosts: vec![owner],
            players: vec![owner],
            teachers: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 1,
        }
    }

    fn every_participant_has_a_role(session: &GameSessionEntity) -> bool {
        session
            .participants()
            .into_iter()
            .all(|user| !roles_of(session, user).is_empty())
    }

    #[test]
    fn join_adds_a_player_until_full() {
        let owner = Uuid::new_v4();
        let mut s = session(owner, Some(2));
        let guest = Uuid::new_v4();

        join(&mut s, guest).unwrap();
        assert_eq!(s.players, vec![owner, guest]);
        assert_eq!(join(&mut s, guest), Err(RoleError::AlreadyParticipant(guest)));
        assert_eq!(
            join(&mut s, Uuid::new_v4()),
            Err(RoleError::SessionFull { max: 2 })
        );
    }

    #[test]
    fn owner_cannot_leave_or_be_removed() {
        let owner = Uuid::new_v4();
        let mut s = session(owner, None);
        assert_eq!(leave(&mut s, owner), Err(RoleError::OwnerMustTransfer));
        assert_eq!(remove_participant(&mut s, owner), Err(RoleError::OwnerNotRemovable));
        assert!(is_participant(&s, owner));
    }

    #[test]
    fn leaving_drops_every_role() {
        let owner = Uuid::new_v4();
        let teacher = Uuid::new_v4();
        let mut s = session(owner, None);
        add_participant(&mut s, teacher, &[MemberRole::Teacher, MemberRole::Player]).unwrap();

        leave(&mut s, teacher).unwrap();
        assert!(!is_participant(&s, teacher));
        assert_eq!(leave(&mut s, teacher), Err(RoleError::NotParticipant(teacher)));
    }

    #[test]
    fn participants_keep_at_least_one_role() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let mut s = session(owner, None);

        assert_eq!(add_participant(&mut s, user, &[]), Err(RoleError::NoRoles));
        add_participant(&mut s, user, &[MemberRole::Teacher]).unwrap();
        assert_eq!(set_roles(&mut s, user, &[]), Err(RoleError::NoRoles));
        assert_eq!(roles_of(&s, user), vec![MemberRole::Teacher]);

        set_roles(&mut s, user, &[MemberRole::Host, MemberRole::Player, MemberRole::Host]).unwrap();
        assert_eq!(roles_of(&s, user), vec![MemberRole::Host, MemberRole::Player]);
        assert!(every_participant_has_a_role(&s));
    }

    #[test]
    fn set_roles_honours_capacity_only_for_new_players() {
        let owner = Uuid::new_v4();
        let teacher = Uuid::new_v4();
        let mut s = session(owner, Some(1));
        add_participant(&mut s, teacher, &[MemberRole::Teacher]).unwrap();

        assert_eq!(
            set_roles(&mut s, teacher, &[MemberRole::Player]),
            Err(RoleError::SessionFull { max: 1 })
        );
        assert_eq!(roles_of(&s, teacher), vec![MemberRole::Teacher]);

        // The owner is already a player, so keeping that role does not need a free slot.
        set_roles(&mut s, owner, &[MemberRole::Player]).unwrap();
        assert_eq!(roles_of(&s, owner), vec![MemberRole::Player]);
    }

    #[test]
    fn set_roles_requires_membership() {
        let mut s = session(Uuid::new_v4(), None);
        let stranger = Uuid::new_v4();
        assert_eq!(
            set_roles(&mut s, stranger, &[MemberRole::Player]),
            Err(RoleError::NotParticipant(stranger))
        );
    }

    #[test]
    fn ownership_moves_only_to_participants() {
        let owner = Uuid::new_v4();
        let host = Uuid::new_v4();
        let mut s = session(owner, None);
        let stranger = Uuid::new_v4();

        assert_eq!(
            transfer_ownership(&mut s, stranger),
            Err(RoleError::NotParticipant(stranger))
        );

        add_participant(&mut s, host, &[MemberRole::Host]).unwrap();
        transfer_ownership(&mut s, host).unwrap();
        assert_eq!(s.owner, host);
        assert_eq!(s.creator, owner);
        leave(&mut s, owner).unwrap();
        assert!(!is_participant(&s, owner));
    }

    #[test]
    fn managers_are_owner_and_hosts() {
        let owner = Uuid::new_v4();
        let host = Uuid::new_v4();
        let player = Uuid::new_v4();
        let mut s = session(owner, None);
        add_participant(&mut s, host, &[MemberRole::Host]).unwrap();
        add_participant(&mut s, player, &[MemberRole::Player]).unwrap();

        assert!(ensure_manager(&s, owner).is_ok());
        assert!(ensure_manager(&s, host).is_ok());
        assert_eq!(ensure_manager(&s, player), Err(RoleError::NotManager));
        assert!(ensure_owner(&s, owner).is_ok());
        assert_eq!(ensure_owner(&s, host), Err(RoleError::NotOwner));
    }
}
