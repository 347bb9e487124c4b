use chess_proto::{CreateRoomPayload, Empty, Event, RoomRefPayload};

use super::game::spawn_session_watcher;
use super::{EventRouter, Outbound, Sender};
use crate::connections::Membership;
use crate::error::StateError;
use crate::session::SessionError;

type Handled = Result<Vec<Outbound>, SessionError>;

/// A player seated in a running game may not open or take another seat.
async fn ensure_not_playing(router: &EventRouter, user_id: &str) -> Result<(), StateError> {
    let Some(session) = router.sessions.game_of(user_id).await else {
        return Ok(());
    };
    match session.get_snapshot().await {
        Ok(snapshot) if snapshot.status.is_active() => Err(StateError::AlreadyInGame),
        _ => Ok(()),
    }
}

pub(super) async fn create_room(
    router: &EventRouter,
    sender: &Sender,
    payload: CreateRoomPayload,
) -> Handled {
    ensure_not_playing(router, &sender.user.id).await?;
    match router
        .rooms
        .create_room(sender.user.clone(), payload.control, payload.bonus)
        .await
    {
        Ok(room) => Ok(vec![Outbound::lobby(Event::AddRoom(room.to_payload()))]),
        Err(StateError::AlreadyOwnsRoom) => Ok(vec![Outbound::user(
            &sender.user.id,
            Event::CreateRoomErr(Empty {}),
        )]),
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn join_room(
    router: &EventRouter,
    sender: &Sender,
    payload: RoomRefPayload,
) -> Handled {
    ensure_not_playing(router, &sender.user.id).await?;
    let joined = router
        .rooms
        .join_room(&payload.room_id, sender.user.clone())
        .await?;

    spawn_session_watcher(router, joined.session.clone(), joined.events);

    for player in joined.session.players() {
        router
            .connections
            .set_membership(player, Membership::Game(joined.session.id().to_string()));
    }

    let mut out = vec![
        Outbound::players(&joined.session, Event::redirect(joined.room.id.clone())),
        Outbound::lobby(Event::remove_room(joined.room.id)),
    ];
    if let Some(own) = joined.withdrawn {
        out.push(Outbound::lobby(Event::remove_room(own.id)));
    }
    Ok(out)
}

pub(super) async fn leave_room(
    router: &EventRouter,
    sender: &Sender,
    payload: RoomRefPayload,
) -> Handled {
    let room = router
        .rooms
        .leave_room(&payload.room_id, &sender.user.id)
        .await?;
    Ok(vec![Outbound::lobby(Event::remove_room(room.id))])
}

/// Current rooms, oldest first, as one ADD_ROOM each.
pub(super) async fn get_rooms(router: &EventRouter, sender: &Sender) -> Handled {
    router
        .connections
        .set_membership(&sender.user.id, Membership::Lobby);
    Ok(router
        .rooms
        .list_rooms()
        .await
        .iter()
        .map(|room| Outbound::user(&sender.user.id, Event::AddRoom(room.to_payload())))
        .collect())
}
