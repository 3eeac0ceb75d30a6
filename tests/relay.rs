//! 실제 서버를 띄우고 WebSocket으로 방 릴레이를 검증합니다.

mod common;

use futures::{SinkExt, StreamExt};
use std::{net::SocketAddr, time::Duration};
use texthooker::{
    db,
    models::{NewLine, SessionKey},
    relay::{ClientEvent, JoinRoom, LineData, Role, SendLine, ServerEvent},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Socket {
    let (ws, _) = connect_async(format!("ws://{}/api/v1/ws", addr)).await.unwrap();
    ws
}

async fn send(ws: &mut Socket, event: ClientEvent) {
    let text = serde_json::to_string(&event).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn recv(ws: &mut Socket) -> ServerEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for relay event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn join(room_id: &str, role: Role, host_token: Option<String>, username: &str) -> ClientEvent {
    ClientEvent::JoinRoom(JoinRoom {
        room_id: room_id.to_string(),
        role,
        host_token,
        username: Some(username.to_string()),
        user_id: None,
    })
}

fn line(id: &str, text: &str) -> LineData {
    LineData {
        id: id.to_string(),
        text: text.to_string(),
        japanese_count: text.chars().count() as i64,
    }
}

fn send_line(room_id: &str, data: LineData) -> ClientEvent {
    ClientEvent::SendLine(SendLine {
        room_id: room_id.to_string(),
        line_data: data,
    })
}

fn member_count(event: &ServerEvent) -> usize {
    match event {
        ServerEvent::RoomUsersUpdate(members) => members.len(),
        other => panic!("expected room_users_update, got {:?}", other),
    }
}

/// 호스트로 방을 만들고 발급된 토큰을 반환합니다.
async fn create_room(ws: &mut Socket, room_id: &str) -> String {
    send(ws, join(room_id, Role::Host, None, "host")).await;
    let ServerEvent::RoomCreated(created) = recv(ws).await else {
        panic!("expected room_created");
    };
    assert_eq!(created.room_id, room_id);
    assert_eq!(member_count(&recv(ws).await), 1);
    created.host_token
}

#[tokio::test]
async fn guest_gets_history_then_lines_in_host_order() {
    let state = common::test_state().await;
    db::append_lines(
        &state.pool,
        &SessionKey::room("room-1"),
        &[NewLine {
            id: "old".to_string(),
            text: "昔の文".to_string(),
            japanese_count: None,
            captured_at: None,
        }],
        24,
    )
    .await
    .unwrap();
    let addr = common::spawn_server(state).await;

    let mut host = connect(addr).await;
    create_room(&mut host, "room-1").await;

    let mut guest = connect(addr).await;
    send(&mut guest, join("room-1", Role::Guest, None, "guest")).await;
    let ServerEvent::LoadHistory(history) = recv(&mut guest).await else {
        panic!("expected load_history");
    };
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "old");
    assert_eq!(history[0].japanese_count, 3);
    assert_eq!(member_count(&recv(&mut guest).await), 2);
    assert_eq!(member_count(&recv(&mut host).await), 2);

    for (id, text) in [("l1", "一"), ("l2", "二"), ("l3", "三")] {
        send(&mut host, send_line("room-1", line(id, text))).await;
    }
    for expected in ["l1", "l2", "l3"] {
        let ServerEvent::ReceiveLine(received) = recv(&mut guest).await else {
            panic!("expected receive_line");
        };
        assert_eq!(received.id, expected);
    }
}

#[tokio::test]
async fn guest_to_missing_room_gets_error() {
    let addr = common::spawn_server(common::test_state().await).await;
    let mut guest = connect(addr).await;

    send(&mut guest, join("nowhere", Role::Guest, None, "guest")).await;
    assert_eq!(
        recv(&mut guest).await,
        ServerEvent::ErrorMessage("room not found".to_string())
    );

    // 입장 실패 후 보낸 문장도 거부됨
    send(&mut guest, send_line("nowhere", line("l1", "文"))).await;
    assert_eq!(
        recv(&mut guest).await,
        ServerEvent::ErrorMessage("not in room".to_string())
    );
}

#[tokio::test]
async fn second_host_needs_the_token() {
    let addr = common::spawn_server(common::test_state().await).await;
    let mut first = connect(addr).await;
    let token = create_room(&mut first, "room-2").await;

    let mut second = connect(addr).await;
    send(&mut second, join("room-2", Role::Host, None, "other")).await;
    assert_eq!(
        recv(&mut second).await,
        ServerEvent::ErrorMessage("room already has a host".to_string())
    );

    send(&mut second, join("room-2", Role::Host, Some(token), "other")).await;
    let ServerEvent::RoomUsersUpdate(members) = recv(&mut second).await else {
        panic!("expected room_users_update");
    };
    let roles: Vec<Role> = members.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Guest, Role::Host]);
    assert_eq!(member_count(&recv(&mut first).await), 2);

    // 강등된 이전 호스트는 더 이상 문장을 보낼 수 없음
    send(&mut first, send_line("room-2", line("l1", "文"))).await;
    assert_eq!(
        recv(&mut first).await,
        ServerEvent::ErrorMessage("only the host can send lines".to_string())
    );
}

#[tokio::test]
async fn host_disconnect_keeps_room_for_guests_and_token_reclaims_it() {
    let state = common::test_state().await;
    let rooms = state.rooms.clone();
    let addr = common::spawn_server(state).await;

    let mut host = connect(addr).await;
    let token = create_room(&mut host, "room-3").await;
    let mut guest = connect(addr).await;
    send(&mut guest, join("room-3", Role::Guest, None, "guest")).await;
    assert!(matches!(recv(&mut guest).await, ServerEvent::LoadHistory(_)));
    assert_eq!(member_count(&recv(&mut guest).await), 2);

    host.close(None).await.unwrap();
    assert_eq!(member_count(&recv(&mut guest).await), 1);
    assert!(rooms.is_live("room-3").await);

    let mut back = connect(addr).await;
    send(&mut back, join("room-3", Role::Host, Some(token), "host")).await;
    assert_eq!(member_count(&recv(&mut back).await), 2);
    assert_eq!(member_count(&recv(&mut guest).await), 2);

    send(&mut back, send_line("room-3", line("l9", "戻"))).await;
    let ServerEvent::ReceiveLine(received) = recv(&mut guest).await else {
        panic!("expected receive_line");
    };
    assert_eq!(received.id, "l9");
}

#[tokio::test]
async fn room_disappears_when_last_connection_closes() {
    let state = common::test_state().await;
    let rooms = state.rooms.clone();
    let addr = common::spawn_server(state).await;

    let mut host = connect(addr).await;
    create_room(&mut host, "room-4").await;
    assert_eq!(rooms.room_count().await, 1);

    host.close(None).await.unwrap();
    for _ in 0..50 {
        if !rooms.is_live("room-4").await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!rooms.is_live("room-4").await);

    // 같은 ID로 새 호스트가 다시 방을 만들 수 있음
    let mut fresh = connect(addr).await;
    create_room(&mut fresh, "room-4").await;
}

#[tokio::test]
async fn member_user_id_comes_only_from_the_connection_token() {
    let addr = common::spawn_server(common::test_state().await).await;

    let (mut host, _) = connect_async(format!("ws://{}/api/v1/ws?token={}", addr, common::token_for("alice")))
        .await
        .unwrap();
    create_room(&mut host, "room-id").await;

    let mut guest = connect(addr).await;
    send(
        &mut guest,
        ClientEvent::JoinRoom(JoinRoom {
            room_id: "room-id".to_string(),
            role: Role::Guest,
            host_token: None,
            username: Some("guest".to_string()),
            user_id: Some("mallory".to_string()),
        }),
    )
    .await;
    let ServerEvent::LoadHistory(_) = recv(&mut guest).await else {
        panic!("expected load_history");
    };
    let ServerEvent::RoomUsersUpdate(members) = recv(&mut guest).await else {
        panic!("expected room_users_update");
    };

    let user_ids: Vec<(Role, Option<&str>)> = members
        .iter()
        .map(|m| (m.role, m.user_id.as_deref()))
        .collect();
    assert_eq!(user_ids.len(), 2);
    assert!(user_ids.contains(&(Role::Host, Some("alice"))));
    assert!(user_ids.contains(&(Role::Guest, None)));
}
