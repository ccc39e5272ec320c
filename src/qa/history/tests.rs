use super::*;

#[test]
fn turns_are_appended_in_order() {
    let mut history = ConversationHistory::new();
    history.push_user("What is covered?");
    history.push_assistant("Signals and systems.");

    assert_eq!(history.len(), 2);
    assert_eq!(history.turns()[0].role, Role::User);
    assert_eq!(history.turns()[1].role, Role::Assistant);
    assert_eq!(history.turns()[1].content, "Signals and systems.");
}

#[test]
fn last_returns_most_recent_turns_oldest_first() {
    let mut history = ConversationHistory::new();
    for i in 0..10 {
        history.push_user(format!("question {i}"));
    }

    let shown: Vec<&str> = history.last(6).iter().map(|t| t.content.as_str()).collect();
    assert_eq!(
        shown,
        vec![
            "question 4",
            "question 5",
            "question 6",
            "question 7",
            "question 8",
            "question 9"
        ]
    );
    assert_eq!(history.last(50).len(), 10);
}

#[test]
fn clear_empties_history() {
    let mut history = ConversationHistory::new();
    history.push_user("hello there");
    history.clear();

    assert!(history.is_empty());
    assert!(history.last(6).is_empty());
}

#[test]
fn role_display_and_serde() {
    assert_eq!(Role::User.to_string(), "user");
    assert_eq!(
        serde_json::to_string(&Role::Assistant).expect("serialize"),
        "\"assistant\""
    );
}
