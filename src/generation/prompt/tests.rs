use super::*;

#[test]
fn contexts_are_trimmed_and_separated() {
    let prompt = build_prompt("What is a stack?", &["  first passage \n", "second passage"]);

    assert!(prompt.contains("CONTEXTS:\nfirst passage\n\n---\n\nsecond passage\n"));
    assert!(prompt.contains("QUESTION:\nWhat is a stack?\n"));
    assert!(!prompt.contains(NO_CONTEXT_NOTE));
}

#[test]
fn missing_context_is_called_out() {
    let prompt = build_prompt::<&str>("Define entropy", &[]);

    assert!(prompt.contains(NO_CONTEXT_NOTE));
    assert!(prompt.contains("QUESTION:\nDefine entropy"));
    assert!(!prompt.contains(CONTEXT_SEPARATOR));
}

#[test]
fn blank_passages_count_as_no_context() {
    let prompt = build_prompt("q", &["   ", "\n"]);
    assert!(prompt.contains(NO_CONTEXT_NOTE));
}

#[test]
fn tutor_goals_present() {
    let prompt = build_prompt("q", &["ctx"]);
    assert!(prompt.contains("structured steps"));
    assert!(prompt.contains("example or analogy"));
    assert!(prompt.contains("quiz question"));
}

#[test]
fn question_embedded_literally() {
    let question = "Why does {x} != \"y\"?\nSecond line";
    let prompt = build_prompt(question, &["ctx"]);
    assert!(prompt.ends_with(&format!("QUESTION:\n{}\n", question)));
}
