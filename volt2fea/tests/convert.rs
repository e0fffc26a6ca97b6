use pretty_assertions::assert_eq;
use tempfile::tempdir;
use volt2fea::{convert_path, convert_str, Error, GlyphOrder, Options, TSIV};
use write_fonts::{
    dump_table,
    tables::{maxp::Maxp, post::Post},
    types::Tag,
    FontBuilder,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn convert(text: &str) -> String {
    init_logging();
    convert_str(text, None, &Options::default()).unwrap()
}

fn lookup(name: &str, context: &str, payload: &str) -> String {
    format!(
        r#"DEF_LOOKUP "{name}" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
IN_CONTEXT
END_CONTEXT
{context}
{payload}
"#
    )
}

#[test]
fn empty_source() {
    assert_eq!(convert("END"), "");
}

#[test]
fn group_substitution_and_feature() {
    let source = format!(
        r#"DEF_GROUP "A"
ENUM GLYPH "a" GLYPH "b" GLYPH "c" END_ENUM
END_GROUP
DEF_SCRIPT NAME "Default" TAG "DFLT"
DEF_LANGSYS NAME "Default" TAG "dflt"
DEF_FEATURE NAME "Standard Ligatures" TAG "liga"
LOOKUP "a_to_b"
END_FEATURE
END_LANGSYS
END_SCRIPT
{}END
"#,
        lookup(
            "a_to_b",
            "",
            r#"AS_SUBSTITUTION
SUB GLYPH "a"
WITH GLYPH "b"
END_SUB
END_SUBSTITUTION"#
        )
    );
    assert_eq!(
        convert(&source),
        "# Glyph classes\n\
         @A = [a b c];\n\
         \n\
         # Lookups\n\
         lookup a_to_b {\n    sub a by b;\n} a_to_b;\n\
         \n\
         # Features\n\
         feature liga {\n    script DFLT;\n    language dflt;\n    lookup a_to_b;\n} liga;\n"
    );
}

#[test]
fn mark_attachment_marks_classes_used() {
    let source = format!(
        r#"DEF_GLYPH "a" ID 1 TYPE BASE END_GLYPH
DEF_GLYPH "acutecomb" ID 2 TYPE MARK END_GLYPH
DEF_GLYPH "gravecomb" ID 3 TYPE MARK END_GLYPH
DEF_SCRIPT NAME "Latin" TAG "latn"
DEF_LANGSYS NAME "Default" TAG "dflt"
DEF_FEATURE NAME "Mark Positioning" TAG "mark"
LOOKUP "mark_top"
END_FEATURE
END_LANGSYS
END_SCRIPT
{}DEF_ANCHOR "top" ON 1 GLYPH a COMPONENT 1 AT POS DX 210 DY 450 END_POS END_ANCHOR
DEF_ANCHOR "MARK_top" ON 2 GLYPH acutecomb COMPONENT 1 AT POS DY 450 END_POS END_ANCHOR
DEF_ANCHOR "MARK_top" ON 3 GLYPH gravecomb COMPONENT 1 AT POS DY 450 END_POS END_ANCHOR
END
"#,
        lookup(
            "mark_top",
            "",
            r#"AS_POSITION
ATTACH GLYPH "a"
TO GLYPH "acutecomb" AT ANCHOR "top"
END_ATTACH
END_POSITION"#
        )
    );
    assert_eq!(
        convert(&source),
        "# Mark classes\n\
         markClass acutecomb <anchor 0 450> @top;\n\
         #markClass gravecomb <anchor 0 450> @top;\n\
         \n\
         # Lookups\n\
         lookup mark_top {\n    pos base a <anchor 210 450> mark @top;\n} mark_top;\n\
         \n\
         # Features\n\
         feature mark {\n    script latn;\n    language dflt;\n    lookup mark_top;\n} mark;\n\
         \n\
         table GDEF {\n    GlyphClassDef [a], , [acutecomb gravecomb], ;\n} GDEF;\n"
    );
}

#[test]
fn contextual_substitution_needs_no_helper() {
    let source = format!(
        "{}END",
        r#"DEF_LOOKUP "ctx" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
IN_CONTEXT
LEFT GLYPH "x"
RIGHT GLYPH "y"
END_CONTEXT
AS_SUBSTITUTION
SUB GLYPH "p"
WITH GLYPH "q"
END_SUB
END_SUBSTITUTION
"#
    );
    assert_eq!(
        convert(&source),
        "# Lookups\nlookup ctx {\n    sub x p' y by q;\n} ctx;\n"
    );
}

#[test]
fn empty_except_context_is_no_context() {
    let source = r#"DEF_LOOKUP "l" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
EXCEPT_CONTEXT
END_CONTEXT
AS_SUBSTITUTION
SUB GLYPH "a"
WITH GLYPH "b"
END_SUB
END_SUBSTITUTION
END"#;
    assert_eq!(
        convert(source),
        "# Lookups\nlookup l {\n    sub a by b;\n} l;\n"
    );
}

#[test]
fn reversal_is_ignored_on_plain_positioning() {
    let source = r#"DEF_LOOKUP "k" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR REVERSAL
IN_CONTEXT
END_CONTEXT
AS_POSITION
ADJUST_SINGLE GLYPH "a" BY POS ADV 10 END_POS
END_ADJUST
END_POSITION
END"#;
    assert_eq!(
        convert(source),
        "# Lookups\nlookup k {\n    pos a 10;\n} k;\n"
    );
}

fn marks_lookup(process_marks: &str) -> String {
    format!(
        r#"DEF_GROUP "marks" ENUM GLYPH "acutecomb" END_ENUM END_GROUP
DEF_LOOKUP "l" PROCESS_BASE PROCESS_MARKS {process_marks} DIRECTION LTR
AS_SUBSTITUTION
SUB GLYPH "a"
WITH GLYPH "b"
END_SUB
END_SUBSTITUTION
END"#
    )
}

#[test]
fn process_marks_group_sets_mark_attachment_type() {
    assert_eq!(
        convert(&marks_lookup(r#""Marks""#)),
        "# Glyph classes\n\
         @marks = [acutecomb];\n\
         \n\
         # Lookups\n\
         lookup l {\n    lookupflag MarkAttachmentType @marks;\n    sub a by b;\n} l;\n"
    );
}

#[test]
fn mark_glyph_set_uses_mark_filtering_set() {
    assert_eq!(
        convert(&marks_lookup(r#"MARK_GLYPH_SET "marks""#)),
        "# Glyph classes\n\
         @marks = [acutecomb];\n\
         \n\
         # Lookups\n\
         lookup l {\n    lookupflag UseMarkFilteringSet @marks;\n    sub a by b;\n} l;\n"
    );
}

#[test]
fn duplicate_language_system_is_fatal() {
    let source = r#"DEF_SCRIPT NAME "Latin" TAG "latn"
DEF_LANGSYS NAME "Default" TAG "dflt"
DEF_FEATURE NAME "Kerning" TAG "kern"
END_FEATURE
DEF_FEATURE NAME "Kerning" TAG "kern"
END_FEATURE
END_LANGSYS
END_SCRIPT
END"#;
    let err = convert_str(source, None, &Options::default()).unwrap_err();
    assert!(
        matches!(err, Error::DuplicateLanguageSystem { feature, .. } if feature == Tag::new(b"kern"))
    );
}

#[test]
fn undefined_lookup_in_feature() {
    let source = r#"DEF_SCRIPT NAME "Latin" TAG "latn"
DEF_LANGSYS NAME "Default" TAG "dflt"
DEF_FEATURE NAME "Kerning" TAG "kern"
LOOKUP "missing"
END_FEATURE
END_LANGSYS
END_SCRIPT
END"#;
    let err = convert_str(source, None, &Options::default()).unwrap_err();
    assert!(matches!(err, Error::UndefinedLookup { name, .. } if name == "missing"));
}

#[test]
fn scripts_are_sorted_with_dflt_first() {
    let feature = |script: &str| {
        format!(
            r#"DEF_SCRIPT TAG "{script}"
DEF_LANGSYS TAG "dflt"
DEF_FEATURE TAG "liga"
LOOKUP "lig"
LOOKUP "lig"
END_FEATURE
END_LANGSYS
END_SCRIPT
"#
        )
    };
    let source = format!(
        "{}{}{}{}END",
        feature("latn"),
        feature("DFLT"),
        feature("cyrl"),
        lookup(
            "lig",
            "",
            r#"AS_SUBSTITUTION
SUB GLYPH "f" GLYPH "i"
WITH GLYPH "f_i"
END_SUB
END_SUBSTITUTION"#
        )
    );
    let fea = convert(&source);
    let features = fea.split("# Features\n").nth(1).unwrap();
    assert_eq!(
        features,
        "feature liga {\n    script DFLT;\n    language dflt;\n    lookup lig;\n    \
         script cyrl;\n    language dflt;\n    lookup lig;\n    \
         script latn;\n    language dflt;\n    lookup lig;\n} liga;\n"
    );
}

#[test]
fn pair_pieces_are_merged() {
    let pair = |name: &str, first: &str, second: &str, adv: i16| {
        lookup(
            name,
            "",
            &format!(
                r#"AS_POSITION
ADJUST_PAIR
FIRST GLYPH "{first}"
SECOND GLYPH "{second}"
1 1 BY POS ADV {adv} END_POS POS END_POS
END_ADJUST
END_POSITION"#
            ),
        )
    };
    let source = format!(
        r#"DEF_SCRIPT TAG "latn"
DEF_LANGSYS TAG "dflt"
DEF_FEATURE TAG "kern"
LOOKUP "kern\1"
LOOKUP "kern\2"
END_FEATURE
END_LANGSYS
END_SCRIPT
{}{}END"#,
        pair("kern\\1", "a", "b", -10),
        pair("kern\\2", "c", "d", -20)
    );
    assert_eq!(
        convert(&source),
        "# Lookups\n\
         lookup kern {\n    # kern\\1\n    enum pos a b -10;\n    subtable;\n    \
         # kern\\2\n    enum pos c d -20;\n} kern;\n\
         \n\
         # Features\n\
         feature kern {\n    script latn;\n    language dflt;\n    lookup kern;\n} kern;\n"
    );
}

#[test]
fn substitution_pieces_stay_separate() {
    let sub = |name: &str| {
        lookup(
            name,
            "",
            r#"AS_SUBSTITUTION
SUB GLYPH "a"
WITH GLYPH "b"
END_SUB
END_SUBSTITUTION"#,
        )
    };
    let source = format!(
        r#"DEF_SCRIPT TAG "latn"
DEF_LANGSYS TAG "dflt"
DEF_FEATURE TAG "salt"
LOOKUP "alt\1"
LOOKUP "alt\2"
END_FEATURE
END_LANGSYS
END_SCRIPT
{}{}END"#,
        sub("alt\\1"),
        sub("alt\\2")
    );
    let fea = convert(&source);
    assert!(fea.contains("lookup alt_1 {\n    sub a by b;\n} alt_1;"));
    assert!(fea.contains("lookup alt_2 {\n    sub a by b;\n} alt_2;"));
    assert!(fea.contains("    lookup alt_1;\n    lookup alt_2;\n"));
    assert!(!fea.contains("subtable;"));
}

#[test]
fn split_pairs_merge_back() {
    init_logging();
    let source = format!(
        r#"DEF_GROUP "O" ENUM GLYPH "O" GLYPH "Q" END_ENUM END_GROUP
DEF_SCRIPT TAG "latn"
DEF_LANGSYS TAG "dflt"
DEF_FEATURE TAG "kern"
LOOKUP "kern"
END_FEATURE
END_LANGSYS
END_SCRIPT
{}END"#,
        lookup(
            "kern",
            "",
            r#"AS_POSITION
ADJUST_PAIR
FIRST GLYPH "A"
FIRST GLYPH "T"
FIRST GROUP "O"
SECOND GLYPH "V"
1 1 BY POS ADV -30 END_POS POS END_POS
2 1 BY POS ADV -20 END_POS POS END_POS
3 1 BY POS ADV -10 END_POS POS END_POS
END_ADJUST
END_POSITION"#
        )
    );
    let options = Options::default().with_max_pairs_per_subtable(3);
    let fea = convert_str(&source, None, &options).unwrap();
    assert_eq!(
        fea,
        "# Glyph classes\n\
         @O = [O Q];\n\
         \n\
         # Lookups\n\
         lookup kern {\n    # kern\n    enum pos A V -30;\n    enum pos T V -20;\n    subtable;\n    \
         # kern\\2\n    enum pos @O V -10;\n} kern;\n\
         \n\
         # Features\n\
         feature kern {\n    script latn;\n    language dflt;\n    lookup kern;\n} kern;\n"
    );
    // without a limit nothing is split
    let unsplit = convert_str(&source, None, &Options::default()).unwrap();
    assert!(!unsplit.contains("subtable;"));
    assert_eq!(unsplit.matches("enum pos").count(), 3);
}

#[test]
fn names_are_sanitized() {
    let source = format!(
        r#"DEF_GROUP "my group" ENUM GLYPH "a" END_ENUM END_GROUP
DEF_GROUP "my-group" ENUM GLYPH "b" END_ENUM END_GROUP
{}END"#,
        lookup(
            "1st lookup",
            "",
            r#"AS_SUBSTITUTION
SUB GROUP "MY GROUP"
WITH GROUP "my-group"
END_SUB
END_SUBSTITUTION"#
        )
    );
    assert_eq!(
        convert(&source),
        "# Glyph classes\n\
         @my_group = [a];\n\
         @my_group_ = [b];\n\
         \n\
         # Lookups\n\
         lookup _1st_lookup {\n    sub @my_group by @my_group_;\n} _1st_lookup;\n"
    );
}

#[test]
fn extension_lookups() {
    let source = format!(
        "COMPILER_USEEXTENSIONLOOKUPS\n{}END",
        lookup(
            "single",
            "",
            r#"AS_POSITION
ADJUST_SINGLE GLYPH "a" BY POS ADV 10 END_POS
END_ADJUST
END_POSITION"#
        )
    );
    assert!(convert(&source).contains("lookup single useExtension {\n    pos a 10;\n"));
}

#[test]
fn ranges_need_a_font() {
    let source = r#"DEF_GLYPH "a" ID 1 END_GLYPH
DEF_GLYPH "c" ID 3 END_GLYPH
DEF_GROUP "abc" ENUM RANGE "a" TO "c" END_ENUM END_GROUP
END"#;
    assert!(matches!(
        convert_str(source, None, &Options::default()),
        Err(Error::MissingGlyphOrder { .. })
    ));
    let order = [".notdef", "a", "b", "c"].into_iter().collect::<GlyphOrder>();
    assert_eq!(
        convert_str(source, Some(order), &Options::default()).unwrap(),
        "# Glyph classes\n@abc = [a b c];\n"
    );
}

fn font(names: &[&str], tsiv: &str) -> Vec<u8> {
    let maxp = Maxp {
        num_glyphs: names.len() as u16,
        max_points: Some(0),
        max_contours: Some(0),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(1),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(0),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
    };
    let mut builder = FontBuilder::default();
    builder.add_raw(Tag::new(b"maxp"), dump_table(&maxp).unwrap());
    builder.add_raw(
        Tag::new(b"post"),
        dump_table(&Post::new_v2(names.iter().copied())).unwrap(),
    );
    builder.add_raw(TSIV, tsiv.as_bytes().to_vec());
    builder.build()
}

#[test]
fn converts_font_with_embedded_project() {
    let source = r#"DEF_GLYPH "uni0061" ID 1 TYPE BASE END_GLYPH
DEF_GLYPH "uni0062" ID 2 TYPE BASE END_GLYPH
DEF_GLYPH "uni0063" ID 3 TYPE BASE END_GLYPH
DEF_GROUP "all" ENUM RANGE "uni0061" TO "uni0063" END_ENUM END_GROUP
END"#;
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("font.ttf");
    std::fs::write(&path, font(&[".notdef", "a", "b", "c"], source)).unwrap();
    assert_eq!(
        convert_path(&path, &Options::default()).unwrap(),
        "# Glyph classes\n\
         @all = [a b c];\n\
         \n\
         table GDEF {\n    GlyphClassDef [a b c], , , ;\n} GDEF;\n"
    );
}

#[test]
fn converts_project_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("project.vtp");
    std::fs::write(
        &path,
        r#"DEF_GROUP "g" ENUM GLYPH "x" END_ENUM END_GROUP END"#,
    )
    .unwrap();
    assert_eq!(
        convert_path(&path, &Options::default()).unwrap(),
        "# Glyph classes\n@g = [x];\n"
    );
}

#[test]
fn permissive_mode_skips_unsupported_lookups() {
    init_logging();
    let source = format!(
        "{}END",
        r#"DEF_LOOKUP "curs" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
IN_CONTEXT
LEFT GLYPH "a"
END_CONTEXT
AS_POSITION
ATTACH_CURSIVE ENTER GLYPH "b"
END_ATTACH
END_POSITION
"#
    );
    assert!(matches!(
        convert_str(&source, None, &Options::default()),
        Err(Error::Unsupported { .. })
    ));
    assert_eq!(
        convert_str(&source, None, &Options::default().permissive()).unwrap(),
        "# Lookups\nlookup curs {\n} curs;\n"
    );
}
