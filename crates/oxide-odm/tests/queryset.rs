mod common;

use bson::oid::ObjectId;
use bson::{doc, Document};
use common::{
    author_doc, book_doc, library, oid, tag_doc, Author, Book, Call, MockStore, Tag, HEX_A,
    HEX_B, HEX_C,
};
use oxide_odm::{cond, Database, FindOptions, Foreign, ForeignList, OdmError, Paging};

const BOOK_1: &str = "6a0000000000000000000001";
const BOOK_2: &str = "6a0000000000000000000002";
const BOOK_3: &str = "6a0000000000000000000003";
const BOOK_4: &str = "6a0000000000000000000004";
const BOOK_5: &str = "6a0000000000000000000005";

fn shelf() -> Vec<Document> {
    vec![
        book_doc(BOOK_1, "A Wizard of Earthsea", HEX_A),
        book_doc(BOOK_2, "The Dispossessed", HEX_A),
        book_doc(BOOK_3, "Dune", HEX_B),
        book_doc(BOOK_4, "Hyperion", HEX_C),
        book_doc(BOOK_5, "Solaris", HEX_C),
    ]
}

#[tokio::test]
async fn test_fetch_all_decodes_records() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);

    let books = db
        .collection::<Book>()
        .unwrap()
        .filter("title__icontains", "the")
        .fetch_all(&db)
        .await
        .unwrap();

    assert_eq!(books.len(), 5);
    assert_eq!(books[2].title, "Dune");
    assert_eq!(books[2].author, Foreign::new("authors", oid(HEX_B)));
    assert!(books[0].tags.is_empty());
    assert_eq!(
        db.store().find_filters("books"),
        vec![doc! { "title": { "$regex": ".*the.*", "$options": "i" } }]
    );
}

#[tokio::test]
async fn test_relationship_filter_on_queryset() {
    let reference = library();
    let store = MockStore::new()
        .with_docs("authors", vec![author_doc(HEX_A, "Ursula K. Le Guin")])
        .with_docs("books", shelf());
    let db = Database::new(store, &reference);

    let qs = db
        .collection::<Book>()
        .unwrap()
        .filter("author", cond! { "name__contains" => "Le Guin" })
        .filter("title__ne", "Dune");

    assert_eq!(
        qs.build_query(&db).await.unwrap().cond(),
        doc! {
            "author.$id": { "$in": [oid(HEX_A)] },
            "title": { "$ne": "Dune" },
        }
    );
    // resolution runs again on every execution
    qs.fetch_all(&db).await.unwrap();
    assert_eq!(db.store().find_filters("authors").len(), 2);
}

#[tokio::test]
async fn test_exclude_negates() {
    let reference = library();
    let db = Database::new(MockStore::new(), &reference);

    let qs = db.table("books").exclude("title", "Dune").filter("year__gte", 1960);
    assert_eq!(
        qs.build_query(&db).await.unwrap().cond(),
        doc! {
            "title": { "$not": { "$eq": "Dune" } },
            "year": { "$gte": 1960 },
        }
    );
}

#[tokio::test]
async fn test_to_json() {
    let reference = library();
    let db = Database::new(MockStore::new(), &reference);
    let json = db.table("books").filter("year__lt", 2000).to_json(&db).await.unwrap();
    assert_eq!(json, r#"{"year":{"$lt":2000}}"#);
}

#[tokio::test]
async fn test_first() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);

    let book = db
        .collection::<Book>()
        .unwrap()
        .order_by("title")
        .page(3, 2)
        .first(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.id, oid(BOOK_1));

    let options = db.store().find_options("books");
    assert_eq!(options[0].limit, Some(1));
    assert_eq!(options[0].skip, None);
    assert_eq!(options[0].sort, Some(doc! { "title": 1 }));

    let db = Database::new(MockStore::new(), &reference);
    let none = db.collection::<Book>().unwrap().first(&db).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_count_ignores_paging() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);

    let total = db
        .table("books")
        .filter("year", 1969)
        .limit(2)
        .offset(1)
        .count(&db)
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(
        db.store().calls(),
        vec![Call::Count {
            collection: "books".to_string(),
            filter: doc! { "year": { "$eq": 1969 } },
        }]
    );
}

#[tokio::test]
async fn test_exists() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);
    assert!(db.table("books").exists(&db).await.unwrap());
    assert!(!db.table("books").offset(5).exists(&db).await.unwrap());

    let options = db.store().find_options("books");
    assert_eq!(options[0], FindOptions::ids_only().limit(1).unwrap());
    assert_eq!(options[1].skip, Some(5));

    let db = Database::new(MockStore::new(), &reference);
    assert!(!db.table("tags").exists(&db).await.unwrap());
}

#[tokio::test]
async fn test_page_data() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);

    let (books, paging) = db
        .collection::<Book>()
        .unwrap()
        .page_data(&db, 2, 2)
        .await
        .unwrap();
    assert_eq!(
        paging,
        Paging {
            page_no: 2,
            page_size: 2,
            total: 5,
            page_total: 3,
        }
    );
    let ids: Vec<ObjectId> = books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![oid(BOOK_3), oid(BOOK_4)]);
}

#[tokio::test]
async fn test_page_data_clamps_page_number() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);

    let (books, paging) = db
        .collection::<Book>()
        .unwrap()
        .page_data(&db, 10, 2)
        .await
        .unwrap();
    assert_eq!(paging.page_no, 3);
    assert_eq!(paging.page_total, 3);
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Solaris");

    let db = Database::new(MockStore::new(), &reference);
    let (books, paging) = db.table("books").page_data(&db, 4, 10).await.unwrap();
    assert!(books.is_empty());
    assert_eq!(paging.page_no, 1);
    assert_eq!(paging.page_total, 0);
}

#[tokio::test]
async fn test_page_data_rejects_zero() {
    let reference = library();
    let db = Database::new(MockStore::new().with_docs("books", shelf()), &reference);

    let err = db.table("books").page_data(&db, 0, 10).await.unwrap_err();
    assert!(matches!(err, OdmError::InvalidPaging(_)));
    let err = db.table("books").page_data(&db, 1, 0).await.unwrap_err();
    assert!(matches!(err, OdmError::InvalidPaging(_)));
    assert_eq!(db.store().call_count(), 0);
}

#[tokio::test]
async fn test_unregistered_collection() {
    struct Magazine;
    impl oxide_odm::Record for Magazine {
        fn id(&self) -> ObjectId {
            ObjectId::from_bytes([0; 12])
        }
    }

    let reference = library();
    let db = Database::new(MockStore::new(), &reference);
    assert!(matches!(
        db.collection::<Magazine>(),
        Err(OdmError::UnregisteredShape(_))
    ));
}

#[tokio::test]
async fn test_decode_failure() {
    let reference = library();
    let db = Database::new(
        MockStore::new().with_docs("books", vec![doc! { "_id": oid(BOOK_1) }]),
        &reference,
    );
    let err = db.collection::<Book>().unwrap().fetch_all(&db).await.unwrap_err();
    assert!(matches!(err, OdmError::Decode(_)));
}

#[tokio::test]
async fn test_deref_empty_reference_skips_store() {
    let reference = library();
    let db = Database::new(MockStore::new(), &reference);

    let none: Foreign<Author> = Foreign::none();
    assert!(db.deref(&none).await.unwrap().is_none());
    let zero: Foreign<Author> = Foreign::new("authors", ObjectId::from_bytes([0; 12]));
    assert!(db.deref(&zero).await.unwrap().is_none());
    assert!(db.deref_list(&ForeignList::<Tag>::new()).await.unwrap().is_empty());

    assert_eq!(db.store().call_count(), 0);
}

#[tokio::test]
async fn test_deref_fetches_target() {
    let reference = library();
    let db = Database::new(
        MockStore::new().with_docs("authors", vec![author_doc(HEX_B, "Frank Herbert")]),
        &reference,
    );

    let foreign: Foreign<Author> = Foreign::new("authors", oid(HEX_B));
    let author = db.deref(&foreign).await.unwrap().unwrap();
    assert_eq!(author.name, "Frank Herbert");
    assert_eq!(
        db.store().find_filters("authors"),
        vec![doc! { "_id": { "$eq": oid(HEX_B) } }]
    );
    assert_eq!(db.store().find_options("authors")[0].limit, Some(1));
}

#[tokio::test]
async fn test_deref_missing_record() {
    let reference = library();
    let db = Database::new(MockStore::new(), &reference);
    let foreign: Foreign<Author> = Foreign::new("authors", oid(HEX_A));
    assert!(db.deref(&foreign).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deref_table_mismatch() {
    let reference = library();
    let db = Database::new(MockStore::new(), &reference);
    let foreign: Foreign<Author> = Foreign::new("tags", oid(HEX_A));
    let err = db.deref(&foreign).await.unwrap_err();
    assert!(matches!(
        err,
        OdmError::TableMismatch { ref expected, ref found } if expected == "authors" && found == "tags"
    ));
    assert_eq!(db.store().call_count(), 0);
}

#[tokio::test]
async fn test_deref_list() {
    let reference = library();
    let db = Database::new(
        MockStore::new().with_docs("tags", vec![tag_doc(HEX_A, "sf"), tag_doc(HEX_C, "classic")]),
        &reference,
    );

    let list: ForeignList<Tag> = vec![
        Foreign::new("tags", oid(HEX_A)),
        Foreign::none(),
        Foreign::new("tags", oid(HEX_C)),
    ]
    .into();
    let tags = db.deref_list(&list).await.unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(
        db.store().find_filters("tags"),
        vec![doc! { "_id": { "$in": [oid(HEX_A), oid(HEX_C)] } }]
    );
}

#[test]
fn test_foreign_from_record() {
    let reference = library();
    let author = Author {
        id: oid(HEX_A),
        name: "Stanisław Lem".to_string(),
    };
    let foreign = Foreign::from_record(&reference, &author).unwrap();
    assert_eq!(foreign.table(), "authors");
    assert_eq!(foreign.id(), oid(HEX_A));

    let unsaved = Author {
        id: ObjectId::from_bytes([0; 12]),
        name: "Draft".to_string(),
    };
    assert!(matches!(
        Foreign::from_record(&reference, &unsaved),
        Err(OdmError::MissingId(ref t)) if t == "authors"
    ));

    let tags = [
        Tag {
            id: oid(HEX_B),
            label: "sf".to_string(),
        },
        Tag {
            id: oid(HEX_C),
            label: "classic".to_string(),
        },
    ];
    let list = ForeignList::from_records(&reference, &tags).unwrap();
    assert_eq!(list.ids(), vec![oid(HEX_B), oid(HEX_C)]);
}

#[test]
fn test_record_round_trips_through_bson() {
    let book = Book {
        id: oid(BOOK_1),
        title: "Dune".to_string(),
        author: Foreign::new("authors", oid(HEX_B)),
        tags: vec![Foreign::new("tags", oid(HEX_C))].into(),
    };
    let stored = bson::to_document(&book).unwrap();
    assert_eq!(
        stored.get_document("author").unwrap(),
        &doc! { "$ref": "authors", "$id": oid(HEX_B) }
    );
    let back: Book = bson::from_document(stored).unwrap();
    assert_eq!(back, book);
}
