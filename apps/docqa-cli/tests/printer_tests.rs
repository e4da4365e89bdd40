use docqa_cli::AnswerPrinter;

fn feed(answers: &[&str]) -> String {
    let mut printer = AnswerPrinter::new();
    answers.iter().map(|a| printer.next(a)).collect()
}

#[test]
fn growing_answer_prints_only_new_text() {
    assert_eq!(feed(&["", "Yes", "Yes,", "Yes, cats", "Yes, cats\n", "Yes, cats\nno"]), "Yes, cats\nno");
}

#[test]
fn trimmed_final_answer_prints_nothing_extra() {
    assert_eq!(feed(&["", "a1 a2", "a1 a2\n", "a1 a2"]), "a1 a2\n");
}

#[test]
fn discarded_tokens_stay_and_output_resumes_on_a_new_line() {
    assert_eq!(feed(&["", "partial", "", "ok", "ok"]), "partial\nok");
    assert_eq!(feed(&["", "a\n", "a\nbroken", "a\n", "a\nfine"]), "a\nbroken\nfine");
}
