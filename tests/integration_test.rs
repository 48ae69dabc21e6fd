//! Integration tests for the arena, codec and event processing flow.

use arena_remote::arena::{Arena, Direction, GridGeometry, PointerOutcome, PointerTracker, Robot};
use arena_remote::bluetooth::{ConnectionEvent, Message};
use arena_remote::events::EventProcessor;
use arena_remote::state::AppState;

fn received(line: &str) -> ConnectionEvent {
    ConnectionEvent::MessageReceived(line.to_string())
}

#[test]
fn test_obstacle_list_round_trip() {
    let mut arena = Arena::new();
    let a = arena.add_obstacle(2, 3).unwrap();
    let b = arena.add_obstacle_sized(10, 12, 2, 3).unwrap();
    arena.edit_obstacle(b, 2, 3, Direction::West).unwrap();
    arena.obstacle_mut(a).unwrap().target_face = Direction::South;

    let line = Message::obstacles(arena.obstacles()).to_line().unwrap();
    assert!(line.ends_with('\n'));

    let Message::Obstacles(batch) = Message::from_line(&line).unwrap() else {
        panic!("expected an obstacle batch");
    };
    let decoded: Vec<_> = batch
        .obstacles
        .iter()
        .map(|r| (r.id, r.x, r.y, r.width, r.height, r.face))
        .collect();
    let expected: Vec<_> = arena
        .obstacles()
        .iter()
        .map(|o| (o.id(), o.x, o.y, o.width(), o.height(), o.target_face))
        .collect();
    assert_eq!(decoded, expected);
    assert_eq!(batch.mode, "0");
}

#[test]
fn test_malformed_record_does_not_poison_batch() {
    let line = r#"{"cat":"obstacles","value":{"obstacles":[
        {"id":1,"x":"x","y":"y","d":0},
        {"id":2,"x":4,"y":5,"d":"E"},
        {"id":3,"x":6,"d":4},
        {"id":4,"x":7,"y":8,"d":9}
    ],"mode":"0"}}"#
        .replace('\n', "");

    let Message::Obstacles(batch) = Message::from_line(&line).unwrap() else {
        panic!("expected an obstacle batch");
    };
    let ids: Vec<u32> = batch.obstacles.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 4]);
    assert_eq!(batch.obstacles[0].face, Direction::East);
    // Unknown direction codes fall back to north.
    assert_eq!(batch.obstacles[1].face, Direction::North);
}

#[test]
fn test_robot_bounds_rejection_keeps_state() {
    let mut processor = EventProcessor::new(AppState::new(20));
    processor.process_event(received(r#"{"cat":"location","value":{"x":17,"y":17,"d":6}}"#));
    let before = processor.arena().robot().copied();
    assert_eq!(before, Some(Robot::new(17, 17, Direction::West)));

    for line in [
        r#"{"cat":"location","value":{"x":18,"y":0,"d":0}}"#,
        r#"{"cat":"location","value":{"x":0,"y":-1,"d":0}}"#,
        r#"{"cat":"location","value":{"x":"a","y":2,"d":0}}"#,
        "{\"cat\":\"location\"",
    ] {
        assert!(!processor.process_event(received(line)));
        assert_eq!(processor.arena().robot().copied(), before);
    }
}

#[test]
fn test_read_loop_messages_apply_in_order() {
    let state = AppState::new(20);
    let mut processor = EventProcessor::new(state.clone());
    let id = processor.arena_mut().add_obstacle(5, 5).unwrap();

    let lines = [
        r#"{"status":"Ready"}"#.to_string(),
        "garbage".to_string(),
        format!(r#"{{"cat":"image-rec","value":{{"image_id":20,"obstacle_id":{}}}}}"#, id),
        r#"{"cat":"image-rec","value":{"image_id":"30","obstacle_id":99}}"#.to_string(),
        r#"{"cat":"status","value":"Running"}"#.to_string(),
    ];
    for line in &lines {
        processor.process_event(received(line));
    }

    assert_eq!(state.get_robot_status().as_deref(), Some("Running"));
    assert_eq!(
        processor.arena().obstacle(id).unwrap().recognized_target(),
        Some("20")
    );
    assert_eq!(processor.arena().obstacles().len(), 1);

    let log = state.log_lines();
    assert_eq!(log.len(), lines.len());
    assert!(log[0].ends_with(r#"Received: {"cat":"status","value":"Running"}"#));
}

#[test]
fn test_ids_restart_after_clear_all() {
    let mut arena = Arena::new();
    let ids: Vec<u32> = (0..5).map(|i| arena.add_obstacle(i * 3, 0).unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    arena.spawn_robot();
    arena.clear_all();
    assert!(arena.robot().is_none());
    assert_eq!(arena.add_obstacle(0, 0).unwrap(), 1);
}

#[test]
fn test_drag_out_of_grid_deletes_obstacle() {
    let mut arena = Arena::new();
    let id = arena.add_obstacle(10, 10).unwrap();
    // 630x630 view: 30px cells, grid starts 30px from the left.
    let geometry = GridGeometry::fit(630.0, 630.0);
    let mut pointer = PointerTracker::new(geometry);

    let (sx, sy) = geometry.footprint_origin(10, 10, 1);
    let grab = (sx + 15.0, sy + 15.0);
    assert_eq!(
        pointer.pointer_down(&mut arena, grab.0, grab.1),
        PointerOutcome::Selected(id)
    );
    pointer.pointer_move(&mut arena, 700.0, grab.1);
    assert!(pointer.is_outside_grid());

    match pointer.pointer_up(&mut arena) {
        PointerOutcome::ObstacleRemoved(obstacle) => assert_eq!(obstacle.id(), id),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(arena.obstacles().is_empty());
}
