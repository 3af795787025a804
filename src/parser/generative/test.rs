use super::GenerativeParser;
use crate::parser::{Parser, ParserFactory, ParserType};
use crate::tree::test::{dog_barks, node, pt};
use crate::tree::Tree;

fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn training() -> Vec<Tree<String>> {
    vec![
        dog_barks(),
        node(
            "ROOT",
            vec![node(
                "S",
                vec![
                    node("NP", vec![pt("DT", "the"), pt("NN", "cat")]),
                    node("VP", vec![pt("VBZ", "sleeps")]),
                    pt(".", "."),
                ],
            )],
        ),
        node("ROOT", vec![node("NP", vec![pt("NN", "dogs")])]),
    ]
}

#[test]
fn recovers_training_structure() {
    let parser = GenerativeParser::train(&training());
    let parse = parser.best_parse(&words("the dog sleeps ."));
    assert_eq!(
        parse.to_string(),
        "(ROOT (S (NP (DT the) (NN dog)) (VP (VBZ sleeps)) (. .)))"
    );
}

#[test]
fn tags_unknown_words() {
    let parser = GenerativeParser::train(&training());
    let parse = parser.best_parse(&words("the zebra barks ."));
    assert_eq!(parse.terminal_yield(), words("the zebra barks ."));
    assert_eq!(parse.preterminal_yield(), words("DT NN VBZ ."));
}

#[test]
fn rebuilds_unary_chains() {
    let parser = GenerativeParser::train(&training());
    let parse = parser.best_parse(&words("cats"));
    assert_eq!(parse.to_string(), "(ROOT (NP (NN cats)))");
}

#[test]
fn falls_back_to_flat_trees() {
    let parser = GenerativeParser::train(&training());
    let parse = parser.best_parse(&words("barks the"));
    assert_eq!(parse.to_string(), "(ROOT (VBZ barks) (DT the))");
    assert_eq!(parser.best_parse(&[]).to_string(), "ROOT");
}

#[test]
fn factory_builds_a_parser() {
    let parser = ParserType::Generative.factory().new_parser(&training());
    let parse = parser.best_parse(&words("the cat barks ."));
    assert_eq!(parse.preterminal_yield(), words("DT NN VBZ ."));
}
