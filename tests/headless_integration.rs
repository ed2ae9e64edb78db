use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use handdrill::hand_table;
use handdrill::runtime::{DrillEvent, Runner, TestEventSource};
use handdrill::session::{AnswerStatus, Drill};
use handdrill::storage::MemoryStore;
use rand::rngs::StdRng;
use rand::SeedableRng;

const TABLE: &str = "Hand,Color,Players,misses\nAA,紺,2,1\n72o,灰,9,1\n";

fn key(c: char) -> DrillEvent {
    DrillEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Headless drill loop over Runner/TestEventSource without a TTY.
// Digits are answers; 'n' moves on once the current hand is graded.
#[test]
fn headless_drill_flow_records_misses() {
    let items = hand_table::load(TABLE.as_bytes()).unwrap();
    let mut drill = Drill::new(items, MemoryStore::new()).with_rng(StdRng::seed_from_u64(8));
    drill.select_next();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));

    // 5 is never correct for this table
    for c in ['5', 'n', '5', 'n', '5'] {
        tx.send(key(c)).unwrap();
    }
    drop(tx);

    let mut ticks = 0;
    for _ in 0..50u32 {
        match runner.step() {
            DrillEvent::Tick => {
                ticks += 1;
                if ticks > 3 {
                    break;
                }
            }
            DrillEvent::Resize => {}
            DrillEvent::Key(key) => match key.code {
                KeyCode::Char('n') if drill.can_advance() => {
                    drill.select_next();
                }
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    drill.submit_answer(c.to_digit(10).unwrap());
                }
                _ => {}
            },
        }
    }

    assert_eq!(drill.status(), AnswerStatus::Incorrect);
    assert_eq!(drill.tally().answered, 3);
    assert_eq!(drill.tally().correct, 0);
    assert_eq!(drill.progress().total_misses(), 3);
    assert_eq!(drill.medium().writes(), 3);
}

#[test]
fn headless_answers_before_next_are_ignored() {
    let items = hand_table::load(TABLE.as_bytes()).unwrap();
    let mut drill = Drill::new(items, MemoryStore::new()).with_rng(StdRng::seed_from_u64(1));
    drill.select_next();
    let target = drill.current_item().unwrap().target;

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));
    let answer = char::from_digit(target, 10).unwrap();
    tx.send(key(answer)).unwrap();
    tx.send(key('5')).unwrap();
    tx.send(DrillEvent::Resize).unwrap();

    for _ in 0..3 {
        if let DrillEvent::Key(key) = runner.step() {
            if let KeyCode::Char(c) = key.code {
                drill.submit_answer(c.to_digit(10).unwrap());
            }
        }
    }

    assert_eq!(drill.status(), AnswerStatus::Correct);
    assert_eq!(drill.tally().answered, 1);
    assert!(drill.progress().is_empty());
    assert_eq!(drill.medium().writes(), 0);
}
