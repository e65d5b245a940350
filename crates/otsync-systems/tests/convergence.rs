//! Scenario and property tests for transforms over the reference systems.

use otsync_core::transform::transform_with;
use otsync_core::{
    CommitId, MergedDiff, MergedSystem, OtState, OtSystem, ParseError, StateError, TransformConfig,
    TransformResult,
};
use otsync_systems::{MapEdit, MapOtSystem, MapState, TextDocument, TextEdit, TextOtSystem};
use proptest::prelude::*;
use proptest::sample::Index;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Generators
// =============================================================================

#[derive(Clone, Debug)]
enum TextOp {
    Insert { at: Index, content: String },
    Delete { at: Index, len: Index },
}

fn text_op() -> impl Strategy<Value = TextOp> {
    prop_oneof![
        (any::<Index>(), "[a-z]{1,4}").prop_map(|(at, content)| TextOp::Insert { at, content }),
        (any::<Index>(), any::<Index>()).prop_map(|(at, len)| TextOp::Delete { at, len }),
    ]
}

/// Turn abstract ops into edits that apply cleanly one after another.
fn text_edits(base: &str, ops: &[TextOp]) -> Vec<TextEdit> {
    let mut doc = TextDocument::new(base);
    let mut edits = Vec::new();

    for op in ops {
        let len = doc.len();
        let edit = match op {
            TextOp::Insert { at, content } => TextEdit::insert(at.index(len + 1), content.clone()),
            TextOp::Delete { at, len: count } => {
                if len == 0 {
                    continue;
                }
                let start = at.index(len);
                let count = count.index(len - start) + 1;
                let content: String = doc.as_str().chars().skip(start).take(count).collect();
                TextEdit::delete(start, content)
            }
        };
        doc.apply(&edit).unwrap();
        edits.push(edit);
    }
    edits
}

#[derive(Clone, Debug)]
enum MapOp {
    Write(u8, u8),
    Remove(u8),
}

fn map_op() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        3 => (0u8..4, 0u8..6).prop_map(|(key, value)| MapOp::Write(key, value)),
        1 => (0u8..4).prop_map(MapOp::Remove),
    ]
}

fn map_edits(base: &MapState<u8, u8>, ops: &[MapOp]) -> Vec<MapEdit<u8, u8>> {
    let mut state = base.clone();
    let mut edits = Vec::new();

    for op in ops {
        let edit = match op {
            MapOp::Write(key, value) => MapEdit::new(*key, state.get(key).copied(), Some(*value)),
            MapOp::Remove(key) => match state.get(key) {
                Some(value) => MapEdit::remove(*key, *value),
                None => continue,
            },
        };
        state.apply(&edit).unwrap();
        edits.push(edit);
    }
    edits
}

fn map_base() -> impl Strategy<Value = MapState<u8, u8>> {
    prop::collection::btree_map(0u8..4, 0u8..6, 0..4).prop_map(MapState::from)
}

/// `base` after `first` and then `then`.
fn applied<S, D>(base: &S, first: &[D], then: &[D]) -> S
where
    S: OtState<D> + Clone,
{
    let mut state = base.clone();
    state.apply_all(first).unwrap();
    state.apply_all(then).unwrap();
    state
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn concurrent_inserts_in_short_text() {
    init_tracing();
    let base = TextDocument::new("AB");
    let left = [TextEdit::insert(1, "X")];
    let right = [TextEdit::insert(2, "Y")];

    let (left_out, right_out) = TextOtSystem.transform(&left, &right).unwrap().into_success().unwrap();

    assert_eq!(applied(&base, &left, &right_out).as_str(), "AXBY");
    assert_eq!(applied(&base, &right, &left_out).as_str(), "AXBY");
}

#[test]
fn deleting_same_text_conflicts() {
    init_tracing();
    let left = vec![TextEdit::insert(0, ">"), TextEdit::delete(2, "b")];
    let right = vec![TextEdit::delete(1, "b")];

    let result = TextOtSystem.transform(&left, &right).unwrap();
    let conflict = result.conflict().unwrap();
    assert_eq!(conflict.left, TextEdit::delete(2, "b"));
    assert_eq!(conflict.right, TextEdit::delete(2, "b"));
}

#[test]
fn removing_same_key_conflicts() {
    init_tracing();
    let system = MapOtSystem::<&str, i32>::new();
    let remove = MapEdit::remove("k", 1);
    assert!(system.transform_one(&remove, &remove).unwrap().is_conflict());
}

#[test]
fn root_commit_id_is_single_zero_byte() {
    assert_eq!(CommitId::root().to_bytes(), vec![0x00]);
    assert_eq!(CommitId::parse(&[0x00]), Ok(CommitId::Root));
    assert!(CommitId::parse(&[0x00, 0x00]).is_err());
    assert_eq!(CommitId::parse(&[0x01, 0x00]), Ok(CommitId::Ordinal(0)));
    assert_ne!(CommitId::Ordinal(0), CommitId::Root);
}

/// Title text plus a tag map, edited as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Note {
    title: TextDocument,
    tags: MapState<&'static str, i32>,
}

type NoteEdit = MergedDiff<TextEdit, MapEdit<&'static str, i32>>;

impl OtState<NoteEdit> for Note {
    fn apply(&mut self, diff: &NoteEdit) -> Result<(), StateError> {
        self.title.apply_all(&diff.first)?;
        self.tags.apply_all(&diff.second)
    }
}

#[test]
fn merged_document_converges() {
    init_tracing();
    let system = MergedSystem::new(TextOtSystem, MapOtSystem::new());
    let base = Note {
        title: TextDocument::new("draft"),
        tags: MapState::new(),
    };

    let left: Vec<NoteEdit> = vec![
        MergedDiff::first_only(vec![TextEdit::insert(0, "first ")]),
        MergedDiff::new(vec![TextEdit::insert(0, "> ")], vec![MapEdit::insert("votes", 1)]),
    ];
    let right: Vec<NoteEdit> = vec![
        MergedDiff::second_only(vec![MapEdit::insert("votes", 4), MapEdit::insert("pinned", 1)]),
        MergedDiff::first_only(vec![TextEdit::insert(5, "s")]),
    ];

    let (left_out, right_out) = system.transform(&left, &right).unwrap().into_success().unwrap();
    let on_left = applied(&base, &left, &right_out);
    let on_right = applied(&base, &right, &left_out);

    assert_eq!(on_left, on_right);
    assert_eq!(on_left.title.as_str(), "> first drafts");
    assert_eq!(on_left.tags.get(&"votes"), Some(&4));
    assert_eq!(on_left.tags.get(&"pinned"), Some(&1));

    let squashed = system.squash(&left);
    assert_eq!(squashed.len(), 1);
    assert_eq!(applied(&base, &squashed, &[]), applied(&base, &left, &[]));
    assert_eq!(applied(&base, &left, &system.invert(&left)), base);
}

#[test]
fn merged_conflict_surfaces() {
    let system = MergedSystem::new(TextOtSystem, MapOtSystem::<&str, i32>::new());
    let left: Vec<NoteEdit> = vec![MergedDiff::second_only(vec![MapEdit::remove("a", 1)])];
    let right: Vec<NoteEdit> = vec![MergedDiff::new(
        vec![TextEdit::insert(0, "x")],
        vec![MapEdit::update("a", 1, 2)],
    )];

    let result = system.transform(&left, &right).unwrap();
    assert!(matches!(result, TransformResult::Conflict(_)));
}

// =============================================================================
// Commit id properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn commit_id_round_trips(ordinal in any::<u64>(), junk in prop::collection::vec(any::<u8>(), 0..4)) {
        let id = CommitId::from_ordinal(ordinal);
        let bytes = id.to_bytes();
        prop_assert_eq!(bytes.len(), id.encoded_len());
        prop_assert_eq!(CommitId::parse(&bytes), Ok(id));

        let mut framed = bytes.clone();
        framed.extend_from_slice(&junk);
        prop_assert_eq!(CommitId::read_prefix(&framed), Ok((id, bytes.len())));
    }

    #[test]
    fn commit_id_prefixes_are_truncated(ordinal in any::<u64>()) {
        let bytes = CommitId::from_ordinal(ordinal).to_bytes();
        for cut in 0..bytes.len() {
            let is_truncated = matches!(
                CommitId::parse(&bytes[..cut]),
                Err(ParseError::Truncated { .. })
            );
            prop_assert!(is_truncated);
        }
    }

    #[test]
    fn only_zero_byte_parses_to_root(bytes in prop::collection::vec(any::<u8>(), 0..12)) {
        if let Ok(id) = CommitId::parse(&bytes) {
            prop_assert_eq!(id.to_bytes(), bytes.clone());
            if id.is_root() {
                prop_assert_eq!(bytes, vec![0x00]);
            }
        }
    }
}

// =============================================================================
// Text properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn text_transform_converges(
        base in "[a-z]{0,12}",
        left_ops in prop::collection::vec(text_op(), 0..6),
        right_ops in prop::collection::vec(text_op(), 0..6),
        squash_inputs in any::<bool>(),
    ) {
        let base = TextDocument::new(base);
        let left = text_edits(base.as_str(), &left_ops);
        let right = text_edits(base.as_str(), &right_ops);
        let config = TransformConfig { squash_inputs, ..TransformConfig::default() };

        match transform_with(&TextOtSystem, &config, &left, &right).unwrap() {
            TransformResult::Success { left: left_out, right: right_out } => {
                prop_assert_eq!(
                    applied(&base, &left, &right_out),
                    applied(&base, &right, &left_out)
                );
            }
            TransformResult::Conflict(conflict) => {
                prop_assert!(!conflict.left.is_insert() && !conflict.right.is_insert());
                prop_assert!(left.iter().any(|e| !e.is_insert()));
                prop_assert!(right.iter().any(|e| !e.is_insert()));
            }
        }
    }

    #[test]
    fn text_squash_keeps_effect(
        base in "[a-z]{0,12}",
        ops in prop::collection::vec(text_op(), 0..10),
    ) {
        let base = TextDocument::new(base);
        let edits = text_edits(base.as_str(), &ops);
        let squashed = TextOtSystem.squash(&edits);

        prop_assert!(squashed.len() <= edits.len());
        prop_assert_eq!(applied(&base, &squashed, &[]), applied(&base, &edits, &[]));
        prop_assert_eq!(TextOtSystem.squash(&squashed), squashed);
    }

    #[test]
    fn text_invert_undoes(
        base in "[a-z]{0,12}",
        ops in prop::collection::vec(text_op(), 0..10),
    ) {
        let base = TextDocument::new(base);
        let edits = text_edits(base.as_str(), &ops);
        let inverted = TextOtSystem.invert(&edits);

        prop_assert_eq!(applied(&base, &edits, &inverted), base.clone());
        prop_assert_eq!(TextOtSystem.invert(&inverted), edits);
    }
}

// =============================================================================
// Map properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn map_transform_converges(
        base in map_base(),
        left_ops in prop::collection::vec(map_op(), 0..6),
        right_ops in prop::collection::vec(map_op(), 0..6),
    ) {
        let left = map_edits(&base, &left_ops);
        let right = map_edits(&base, &right_ops);
        let system = MapOtSystem::new();

        match system.transform(&left, &right).unwrap() {
            TransformResult::Success { left: left_out, right: right_out } => {
                prop_assert_eq!(
                    applied(&base, &left, &right_out),
                    applied(&base, &right, &left_out)
                );
            }
            TransformResult::Conflict(conflict) => {
                prop_assert_eq!(&conflict.left.key, &conflict.right.key);
                prop_assert!(conflict.left.next.is_none() || conflict.right.next.is_none());
            }
        }
    }

    #[test]
    fn map_squash_and_invert(
        base in map_base(),
        ops in prop::collection::vec(map_op(), 0..10),
    ) {
        let edits = map_edits(&base, &ops);
        let system = MapOtSystem::new();
        let squashed = system.squash(&edits);

        prop_assert!(squashed.len() <= edits.len());
        prop_assert_eq!(applied(&base, &squashed, &[]), applied(&base, &edits, &[]));
        prop_assert_eq!(system.squash(&squashed), squashed);
        prop_assert_eq!(applied(&base, &edits, &system.invert(&edits)), base);
    }
}

#[test]
fn map_edits_serialize() {
    let json = serde_json::to_value(MapEdit::update("a", 1, 2)).unwrap();
    assert_eq!(json, serde_json::json!({"key": "a", "prev": 1, "next": 2}));

    let edit = TextEdit::delete(3, "xyz");
    let mut bytes = Vec::new();
    ciborium::into_writer(&edit, &mut bytes).unwrap();
    let decoded: TextEdit = ciborium::from_reader(bytes.as_slice()).unwrap();
    assert_eq!(decoded, edit);
}
