use proptest::prelude::*;
use roomdb::grammar::parse;
use roomdb::term::render;
use roomdb::fact::is_ground;

fn piece() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        "#[a-z0-9]{1,6}",
        "-?[0-9]{1,4}",
        "[0-9]{1,3}\\.[0-9]{1,3}",
        r#""[a-z \t\\]{0,8}""#,
        r#""[a-z]{0,3}\\[nt\\][a-z]{0,3}""#,
        "[,.;:]",
    ]
}

proptest! {
    #[test]
    fn ground_facts_survive_render_and_parse(pieces in prop::collection::vec(piece(), 1..8)) {
        let text = pieces.join(" ");
        let fact = parse(&text).unwrap();
        prop_assert!(is_ground(&fact));
        let again = parse(&render(&fact)).unwrap();
        prop_assert_eq!(again, fact);
    }
}
