use colstripe::basic::{ConvertedType, Encoding, PhysicalType, Repetition};
use colstripe::error::SchemaError;
use colstripe::field::{DataType, Field, PrimitiveType};
use colstripe::metadata::{to_schema_elements, FileMetaData};
use colstripe::schema::{long, optional_group, optional_string, string, Schema};
use colstripe::test_utils::{document_schema, init_tracing};
use colstripe::SchemaDescriptor;

/// Integration tests using the example schema from the [Dremel paper]
///
/// These tests verify several aspects using the complex "Document" schema:
/// 1. Creation of the schema with required, optional and repeated fields.
/// 2. Enumeration of all leaf column paths of the catalog.
/// 3. Calculation of max definition and repetition levels.
/// 4. Survival of the catalog through the footer's flat schema elements.
///
/// [Dremel paper]: https://static.googleusercontent.com/media/research.google.com/en//pubs/archive/36632.pdf
fn create_doc() -> SchemaDescriptor {
    init_tracing();
    document_schema().into_descriptor().unwrap()
}

mod schema_validation {
    use super::*;

    #[test]
    fn test_doc_root() {
        let doc = document_schema();

        assert_eq!(doc.name(), "Document", "Doc name should match");
        assert_eq!(
            doc.fields().len(),
            3,
            "Doc should have exactly 3 fields at the top-level: DocId, Links & Name"
        );
    }

    #[test]
    fn test_docid_field() {
        let doc = document_schema();
        let doc_id = &doc.fields()[0];

        assert_eq!(doc_id.name(), "DocId", "First field should be DocId");
        assert_eq!(
            doc_id.data_type(),
            &DataType::Primitive(PrimitiveType::int64()),
            "DocId should be an INT64"
        );
        assert!(
            !doc_id.is_optional(),
            "DocId should be required (not optional)"
        );
    }

    #[test]
    fn test_links_group() {
        let doc = document_schema();
        let links = &doc.fields()[1];

        assert_eq!(links.name(), "Links", "Second field should be Links");
        assert!(links.is_optional(), "Links group should be optional");
        match links.data_type() {
            DataType::Struct(fields) => {
                assert_eq!(fields.len(), 2, "Links group should contain exactly 2 fields");
                for (field, name) in fields.iter().zip(["Backward", "Forward"]) {
                    assert_eq!(field.name(), name);
                    assert!(field.data_type().is_list(), "{} should be a list", name);
                    assert!(field.is_optional(), "{} should be optional", name);
                }
            }
            other => panic!("Links should be a Struct type, found: {}", other.type_label()),
        }
    }

    #[test]
    fn test_name_group() {
        let doc = document_schema();
        let name = &doc.fields()[2];

        let DataType::List(element) = name.data_type() else {
            panic!("Name should be a List type, found: {}", name.data_type().type_label());
        };
        let DataType::Struct(fields) = element.data_type() else {
            panic!(
                "Name list should contain Struct elements, found: {}",
                element.data_type().type_label()
            );
        };
        assert_eq!(fields.len(), 2, "Name group should contain exactly 2 fields");
        assert_eq!(fields[0].name(), "Language");
        assert!(fields[0].data_type().is_list(), "Language should be a List type");
        assert_eq!(fields[1].name(), "Url", "Second field in Name should be Url");
        assert!(fields[1].is_optional(), "Url should be optional");
    }

    #[test]
    fn test_invalid_schemas() {
        let empty_group = Schema::new("doc", vec![optional_group("meta", vec![])]);
        assert!(empty_group.into_descriptor().is_err(), "Groups need children");

        let duplicate = Schema::new("doc", vec![long("a"), string("a")]);
        assert!(duplicate.into_descriptor().is_err(), "Names are unique per group");
    }

    #[test]
    fn test_invalid_decimals() {
        let decimal = |physical, precision, scale| {
            Schema::new(
                "doc",
                vec![Field::new(
                    "amount",
                    DataType::Primitive(PrimitiveType::decimal(physical, precision, scale)),
                    Repetition::Required,
                )],
            )
            .into_descriptor()
        };

        assert!(decimal(PhysicalType::Int32, 9, 2).is_ok());
        assert!(decimal(PhysicalType::Int32, 10, 2).is_err(), "INT32 holds 9 digits");
        assert!(decimal(PhysicalType::Int64, 18, 0).is_ok());
        assert!(decimal(PhysicalType::Int64, 19, 0).is_err(), "INT64 holds 18 digits");
        assert!(decimal(PhysicalType::Int64, 4, 5).is_err(), "Scale exceeds precision");
        assert!(decimal(PhysicalType::Double, 4, 2).is_err(), "Doubles are not decimals");
    }

    #[test]
    fn test_encoding_must_fit_type() {
        let fits = Schema::new("doc", vec![long("id").with_encoding(Encoding::DeltaBinaryPacked)]);
        assert!(fits.into_descriptor().is_ok());

        let misfit = Schema::new("doc", vec![string("name").with_encoding(Encoding::DeltaBinaryPacked)]);
        let err = misfit.into_descriptor().unwrap_err();
        assert!(
            matches!(err, SchemaError::UnsupportedTypeCombination { .. }),
            "Expected an unsupported combination, found: {:?}",
            err
        );
    }
}

mod schema_catalog {
    use super::*;

    /// Leaf columns in Document, with the list wrappers of repeated fields.
    #[test]
    fn test_leaf_paths() {
        let doc = create_doc();

        assert_eq!(
            doc.leaf_paths(),
            vec![
                "DocId",
                "Links.Backward.list.element",
                "Links.Forward.list.element",
                "Name.list.element.Language.list.element.Code",
                "Name.list.element.Language.list.element.Country",
                "Name.list.element.Url",
            ]
        );
    }

    ///
    /// | Path                  | Definition Level | Repetition Level |
    /// |-----------------------|------------------|------------------|
    /// | DocId                 | 0                | 0                |
    /// | Links.Backward        | 3                | 1                |
    /// | Links.Forward         | 3                | 1                |
    /// | Name.Language.Code    | 4                | 2                |
    /// | Name.Language.Country | 5                | 2                |
    /// | Name.Url              | 3                | 1                |
    ///
    /// Each list adds an optional wrapper on top of the paper's levels.
    #[test]
    fn test_levels() {
        let doc = create_doc();
        let levels: Vec<(u16, u16)> = doc
            .columns()
            .iter()
            .map(|c| (c.max_definition_level(), c.max_repetition_level()))
            .collect();

        assert_eq!(levels, vec![(0, 0), (3, 1), (3, 1), (4, 2), (5, 2), (3, 1)]);
        assert_eq!(doc.max_definition_level("Links").unwrap(), 1);
        assert_eq!(doc.max_repetition_level("Name.list").unwrap(), 1);
    }

    #[test]
    fn test_column_types() {
        let doc = create_doc();
        let code = doc
            .column_by_path("Name.list.element.Language.list.element.Code")
            .unwrap();

        assert_eq!(code.physical_type(), PhysicalType::ByteArray);
        assert_eq!(code.converted_type(), Some(ConvertedType::Utf8));
        assert_eq!(code.repetition(), Repetition::Required);
        assert!(doc.column_by_path("Name.list.element").is_err(), "Groups are not columns");
    }
}

mod schema_footer {
    use super::*;

    #[test]
    fn test_schema_elements_round_trip() {
        let doc = create_doc();
        let elements = to_schema_elements(&doc);

        assert_eq!(elements.len(), doc.nodes().len());
        assert_eq!(elements[0].name, "Document");
        assert_eq!(elements[0].num_children, Some(3));
        assert_eq!(elements[0].repetition, None, "The root carries no repetition");

        let rebuilt = SchemaDescriptor::from_schema_elements(&elements).unwrap();
        assert_eq!(rebuilt.leaf_paths(), doc.leaf_paths());
        for (a, b) in rebuilt.columns().iter().zip(doc.columns()) {
            assert_eq!(a.max_definition_level(), b.max_definition_level(), "{}", a.path());
            assert_eq!(a.max_repetition_level(), b.max_repetition_level(), "{}", a.path());
            assert_eq!(a.primitive(), b.primitive(), "{}", a.path());
        }
    }

    #[test]
    fn test_decimal_survives_footer() {
        let schema = Schema::new(
            "prices",
            vec![Field::new(
                "amount",
                DataType::Primitive(
                    PrimitiveType::decimal(PhysicalType::FixedLenByteArray, 12, 3).with_type_length(8),
                ),
                Repetition::Optional,
            )],
        )
        .into_descriptor()
        .unwrap();

        let metadata = FileMetaData {
            version: 1,
            schema: to_schema_elements(&schema),
            num_rows: 0,
            row_groups: vec![],
            key_value_metadata: None,
            created_by: None,
        };
        let read = FileMetaData::from_bytes(&metadata.to_bytes()).unwrap();
        let rebuilt = SchemaDescriptor::from_schema_elements(&read.schema).unwrap();
        let amount = rebuilt.column(0).primitive();

        assert_eq!(amount.precision(), Some(12));
        assert_eq!(amount.scale(), Some(3));
        assert_eq!(amount.type_length(), Some(8));
        assert_eq!(amount.converted(), Some(ConvertedType::Decimal));
    }

    #[test]
    fn test_external_names() {
        let schema = Schema::new("doc", vec![optional_string("e-mail")]).into_descriptor().unwrap();

        assert_eq!(schema.leaf_paths(), vec!["e_mail"]);
        assert_eq!(schema.to_internal_path("e-mail").unwrap(), "e_mail");
        assert_eq!(schema.to_external_path("e_mail").unwrap(), "e-mail");
    }
}
