use colstripe::assemble::{assemble, assemble_parallel};
use colstripe::error::ShredError;
use colstripe::physical::PhysicalValue;
use colstripe::properties::build_pool;
use colstripe::shred::{shred, shred_parallel};
use colstripe::test_utils::{contact_records, contact_schema, document_records, document_schema, init_tracing};
use colstripe::{SchemaDescriptor, Table, Value, ValueBuilder};

fn bytes(s: &str) -> Option<PhysicalValue> {
    Some(PhysicalValue::ByteArray(s.as_bytes().to_vec()))
}

fn levels(table: &Table) -> (Vec<u16>, Vec<u16>) {
    (
        table.repetition_levels().to_vec(),
        table.definition_levels().to_vec(),
    )
}

fn doc_schema() -> SchemaDescriptor {
    init_tracing();
    document_schema().into_descriptor().unwrap()
}

mod dremel_records {
    use super::*;

    #[test]
    fn test_docid_column() {
        let schema = doc_schema();
        let tables = shred(&document_records(), &schema).unwrap();
        let doc_id = tables.get("DocId").unwrap();

        assert_eq!(
            doc_id.values(),
            &[Some(PhysicalValue::Int64(10)), Some(PhysicalValue::Int64(20))]
        );
        assert_eq!(levels(doc_id), (vec![0, 0], vec![0, 0]));
    }

    #[test]
    fn test_links_columns() {
        let schema = doc_schema();
        let tables = shred(&document_records(), &schema).unwrap();

        let backward = tables.get("Links.Backward.list.element").unwrap();
        assert_eq!(
            backward.values(),
            &[None, Some(PhysicalValue::Int64(10)), Some(PhysicalValue::Int64(30))]
        );
        assert_eq!(
            levels(backward),
            (vec![0, 0, 1], vec![1, 3, 3]),
            "A null Backward inside a present Links stops at level 1"
        );

        let forward = tables.get("Links.Forward.list.element").unwrap();
        assert_eq!(forward.len(), 4, "Three values in the first record, one in the second");
        assert_eq!(levels(forward), (vec![0, 1, 1, 0], vec![3, 3, 3, 3]));
    }

    #[test]
    fn test_name_language_columns() {
        let schema = doc_schema();
        let tables = shred(&document_records(), &schema).unwrap();

        let code = tables
            .get("Name.list.element.Language.list.element.Code")
            .unwrap();
        assert_eq!(
            code.values(),
            &[bytes("en-us"), bytes("en"), None, bytes("en-gb"), None]
        );
        assert_eq!(levels(code), (vec![0, 2, 1, 1, 0], vec![4, 4, 2, 4, 2]));

        let country = tables
            .get("Name.list.element.Language.list.element.Country")
            .unwrap();
        assert_eq!(country.values(), &[bytes("us"), None, None, bytes("gb"), None]);
        assert_eq!(levels(country), (vec![0, 2, 1, 1, 0], vec![5, 4, 2, 5, 2]));
    }

    #[test]
    fn test_name_url_column() {
        let schema = doc_schema();
        let tables = shred(&document_records(), &schema).unwrap();
        let url = tables.get("Name.list.element.Url").unwrap();

        assert_eq!(
            url.values(),
            &[bytes("http://A"), bytes("http://B"), None, bytes("http://C")]
        );
        assert_eq!(levels(url), (vec![0, 1, 1, 0], vec![3, 3, 2, 3]));
    }

    #[test]
    fn test_levels_within_bounds() {
        let schema = doc_schema();
        let tables = shred(&document_records(), &schema).unwrap();

        for table in tables.iter() {
            let path = table.path().to_dotted();
            assert!(
                table.definition_levels().iter().all(|&d| d <= table.max_definition_level()),
                "Definition level out of bounds in {}",
                path
            );
            assert!(
                table.repetition_levels().iter().all(|&r| r <= table.max_repetition_level()),
                "Repetition level out of bounds in {}",
                path
            );
            assert_eq!(table.num_rows(), 2, "Every column sees both records in {}", path);
            assert!(table.validate().is_ok());
        }
    }

    #[test]
    fn test_assembles_original_records() {
        let schema = doc_schema();
        let records = document_records();
        let tables = shred(&records, &schema).unwrap();

        let assembled = assemble(&schema, &tables, 0..2).unwrap();
        assert_eq!(assembled, records);

        let second = assemble(&schema, &tables, 1..2).unwrap();
        assert_eq!(second, records[1..].to_vec(), "Assembles a single row from the middle");
    }
}

mod contacts {
    use super::*;

    #[test]
    fn test_nulls_and_empty_lists() {
        init_tracing();
        let schema = contact_schema().into_descriptor().unwrap();
        let records = vec![
            ValueBuilder::default()
                .field("id", 1i64)
                .field("name", "a")
                .repeated("tags", vec!["x", "y"])
                .build(),
            ValueBuilder::default()
                .field("id", 2i64)
                .field("name", Value::Null)
                .field("tags", Value::List(vec![]))
                .build(),
        ];
        let tables = shred(&records, &schema).unwrap();

        let id = tables.get("id").unwrap();
        assert_eq!(levels(id), (vec![0, 0], vec![0, 0]));

        let name = tables.get("name").unwrap();
        assert_eq!(name.definition_levels(), &[1, 0], "A null name is not defined");

        let tags = tables.get("tags.list.element").unwrap();
        assert_eq!(tags.values(), &[bytes("x"), bytes("y"), None]);
        assert_eq!(
            levels(tags),
            (vec![0, 1, 0], vec![2, 2, 1]),
            "An empty list defines the list but no element"
        );
    }

    #[test]
    fn test_rejects_invalid_records() {
        let schema = contact_schema().into_descriptor().unwrap();

        let missing_id = ValueBuilder::default().field("name", "a").build();
        let err = shred(&[missing_id], &schema).unwrap_err();
        assert!(
            matches!(err, ShredError::RequiredFieldIsNull { .. }),
            "Expected a required field error, found: {:?}",
            err
        );

        let wrong_type = ValueBuilder::default().field("id", "one").build();
        assert!(matches!(
            shred(&[wrong_type], &schema),
            Err(ShredError::ValueTypeMismatch { .. })
        ));

        let unknown = ValueBuilder::default()
            .field("id", 1i64)
            .field("email", "a@b")
            .build();
        assert!(matches!(
            shred(&[unknown], &schema),
            Err(ShredError::UnknownField { .. })
        ));

        assert!(matches!(
            shred(&[Value::Int(1)], &schema),
            Err(ShredError::InputValueMustBeAStruct)
        ));
    }

    #[test]
    fn test_merge_of_parts_equals_whole() {
        let schema = contact_schema().into_descriptor().unwrap();
        let records = contact_records(97);
        let whole = shred(&records, &schema).unwrap();

        for split in [0, 1, 40, 96, 97] {
            let mut merged = shred(&records[..split], &schema).unwrap();
            merged.merge(shred(&records[split..], &schema).unwrap());
            assert_eq!(merged, whole, "Shredding split at {} should match", split);
        }
    }

    #[test]
    fn test_parallel_shred_and_assembly() {
        let schema = contact_schema().into_descriptor().unwrap();
        let records = contact_records(1000);
        let pool = build_pool(4).unwrap();

        let sequential = shred(&records, &schema).unwrap();
        let parallel = shred_parallel(&records, &schema, &pool).unwrap();
        assert_eq!(parallel, sequential, "Parallel shredding keeps record order");
        assert_eq!(parallel.num_rows(), 1000);

        let assembled = assemble_parallel(&schema, &parallel, &pool).unwrap();
        assert_eq!(assembled, records);
    }

    #[test]
    fn test_pop_keeps_whole_records() {
        let schema = contact_schema().into_descriptor().unwrap();
        let records = contact_records(10);
        let mut tables = shred(&records, &schema).unwrap();

        let front = tables.pop(4);
        assert_eq!(front.num_rows(), 4);
        assert_eq!(tables.num_rows(), 6);
        assert_eq!(assemble(&schema, &front, 0..4).unwrap(), records[..4].to_vec());
        assert_eq!(assemble(&schema, &tables, 0..6).unwrap(), records[4..].to_vec());
    }
}
