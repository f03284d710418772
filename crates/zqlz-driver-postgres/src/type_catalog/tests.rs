use super::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("int4", 23)]
#[case("INTEGER", 23)]
#[case(" bigint ", 20)]
#[case("varchar", 1043)]
#[case("Character Varying", 1043)]
#[case("numeric", 1700)]
#[case("timestamptz", 1184)]
#[case("jsonb", 3802)]
#[case("refcursor", 1790)]
#[case("cursor", 1790)]
#[case("_int4", 1007)]
fn test_resolves_type_oids(#[case] type_name: &str, #[case] oid: i32) {
    assert_eq!(PostgresTypeCatalog::new().resolve(type_name), Some(oid));
}

#[rstest]
#[case("NOTATYPE")]
#[case("")]
#[case("varchar2")]
fn test_unknown_type_names(#[case] type_name: &str) {
    assert_eq!(PostgresTypeCatalog::new().resolve(type_name), None);
}

#[test]
fn test_codes_map_back_to_types() {
    let code = PostgresTypeCatalog::new().resolve("double precision").unwrap();
    assert_eq!(PostgresTypeCatalog::type_for_code(code), Some(Type::FLOAT8));
    assert_eq!(PostgresTypeCatalog::type_for_code(-5), None);
}

#[test]
fn test_catalog_name() {
    assert_eq!(PostgresTypeCatalog::new().name(), POSTGRES_TYPE_CATALOG);
}
