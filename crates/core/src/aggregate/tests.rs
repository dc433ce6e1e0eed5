use super::*;
use crate::filter::Focus;
use crate::investigated::InvestigatedSet;
use crate::model::{FileNode, Finding};
use crate::taxonomy::{INVESTIGATED_DIM, INVESTIGATED_TIER, Taxonomy};

fn finding(tier: &str, dim: &str, severity: Severity, line: u32, symbol: &str) -> Finding {
    Finding {
        id: format!("{dim}_rule"),
        tier_id: tier.to_string(),
        dim_id: dim.to_string(),
        severity,
        line,
        symbol: symbol.to_string(),
        label: format!("{dim} issue"),
        investigated: false,
    }
}

fn scenario_tree() -> Tree {
    let mut tree = Tree::new();
    tree.insert(
        "src",
        "a.go",
        FileNode {
            findings: vec![finding("security", "injection", Severity::Critical, 10, "run")],
            symbols: vec!["run".to_string()],
        },
    );
    tree
}

fn mixed_tree() -> Tree {
    let mut tree = Tree::new();
    tree.insert(
        "cmd",
        "main.go",
        FileNode {
            findings: vec![finding("observability", "debug", Severity::Info, 3, "main")],
            symbols: vec!["main".to_string()],
        },
    );
    tree.insert(
        "internal",
        "store.go",
        FileNode {
            findings: vec![
                finding("security", "secrets", Severity::Critical, 12, "open"),
                finding("quality", "errors", Severity::Warning, 40, "close"),
                finding("quality", "errors", Severity::Warning, 41, "close"),
                finding("architecture", "antipattern", Severity::Warning, 2, ""),
            ],
            symbols: vec!["open".to_string(), "close".to_string(), "unused".to_string()],
        },
    );
    tree.insert(
        "internal",
        "cache.go",
        FileNode {
            findings: vec![finding("performance", "memory", Severity::Warning, 8, "grow")],
            symbols: vec!["grow".to_string()],
        },
    );
    tree.insert("web", "clean.go", FileNode::default());
    tree
}

fn all_on(taxonomy: &Taxonomy) -> FilterState {
    let mut filter = FilterState::defaults(taxonomy);
    if !filter.is_active(INVESTIGATED_DIM) {
        filter.toggle_dimension(taxonomy, INVESTIGATED_DIM).unwrap();
    }
    filter.set_focus(Focus::All);
    filter
}

#[test]
fn scenario_single_critical_injection() {
    let taxonomy = Taxonomy::builtin();
    let filter = FilterState::defaults(&taxonomy);
    let agg = aggregate(&scenario_tree(), &Scope::Root, &filter);

    assert_eq!(agg.total, 1);
    assert_eq!(agg.tier_count("security"), 1);
    assert_eq!(agg.by_tier.len(), 1);
    assert_eq!(
        agg.by_severity,
        SeverityCounts {
            critical: 1,
            warning: 0,
            info: 0
        }
    );
    let risk = agg.risk();
    assert_eq!(risk.score, 25);
    assert_eq!(risk.class, RiskClass::Medium);
}

#[test]
fn scenario_dimension_off_empties_root() {
    let taxonomy = Taxonomy::builtin();
    let mut filter = FilterState::defaults(&taxonomy);
    filter.toggle_dimension(&taxonomy, "injection").unwrap();
    let agg = aggregate(&scenario_tree(), &Scope::Root, &filter);
    assert_eq!(agg.total, 0);
    assert!(agg.by_tier.is_empty());
}

#[test]
fn scenario_investigated_overlay() {
    let taxonomy = Taxonomy::builtin();
    let mut tree = mixed_tree();
    tree.apply_investigated(&InvestigatedSet::from_paths(["internal/cache.go"]));

    let mut filter = FilterState::defaults(&taxonomy);
    let default_view = aggregate(&tree, &Scope::Root, &filter);
    assert_eq!(default_view.tier_count("performance"), 0);
    assert_eq!(default_view.investigated, 1);

    filter.toggle_dimension(&taxonomy, INVESTIGATED_DIM).unwrap();
    let overlay = aggregate(&tree, &Scope::Root, &filter);
    assert_eq!(overlay.tier_count("performance"), 1);
    assert_eq!(overlay.total, default_view.total + 1);
    assert_eq!(overlay.investigated, 0);

    filter.solo_tier(&taxonomy, INVESTIGATED_TIER).unwrap();
    let solo = aggregate(&tree, &Scope::Root, &filter);
    assert_eq!(solo.total, 1);
    assert_eq!(solo.by_tier.keys().collect::<Vec<_>>(), vec!["performance"]);
}

#[test]
fn hidden_investigated_count_ignores_focus() {
    let taxonomy = Taxonomy::builtin();
    let mut tree = Tree::new();
    tree.insert(
        "cmd",
        "main.go",
        FileNode {
            findings: vec![finding("observability", "debug", Severity::Info, 3, "main")],
            symbols: vec!["main".to_string()],
        },
    );
    tree.apply_investigated(&InvestigatedSet::from_paths(["cmd/main.go"]));

    let filter = FilterState::defaults(&taxonomy);
    assert_eq!(filter.focus(), Focus::Recon);
    let agg = aggregate(&tree, &Scope::Root, &filter);
    assert_eq!(agg.total, 0);
    assert_eq!(agg.investigated, 1);
}

#[test]
fn all_dimensions_off_yields_zero_everywhere() {
    let taxonomy = Taxonomy::builtin();
    let mut filter = all_on(&taxonomy);
    for tier in taxonomy.list_tiers() {
        filter.toggle_tier(&taxonomy, &tier.id).unwrap();
    }
    let mut tree = mixed_tree();
    tree.apply_investigated(&InvestigatedSet::from_paths(["cmd/main.go"]));

    let scopes = [
        Scope::Root,
        Scope::Folder("internal".to_string()),
        Scope::file("internal", "store.go"),
        Scope::file("cmd", "main.go"),
    ];
    for scope in &scopes {
        assert_eq!(aggregate(&tree, scope, &filter).total, 0, "{scope:?}");
        for row in children(&tree, scope, &filter) {
            assert_eq!(row.aggregate.total, 0);
        }
    }
}

#[test]
fn everything_on_counts_raw_findings() {
    let taxonomy = Taxonomy::builtin();
    let filter = all_on(&taxonomy);
    let tree = mixed_tree();
    assert_eq!(aggregate(&tree, &Scope::Root, &filter).total, tree.finding_count());
    assert_eq!(
        aggregate(&tree, &Scope::Folder("internal".to_string()), &filter).total,
        5
    );
    assert_eq!(
        aggregate(&tree, &Scope::file("internal", "store.go"), &filter).total,
        4
    );
}

#[test]
fn risk_score_is_bounded_and_monotonic() {
    let mut previous = 0;
    for critical in 0..8 {
        let mut row_previous = 0;
        for warning in 0..15 {
            let risk = RiskScore::from_counts(&SeverityCounts {
                critical,
                warning,
                info: 50,
            });
            assert!(risk.score <= MAX_RISK_SCORE);
            assert!(risk.score >= row_previous);
            row_previous = risk.score;
        }
        let risk = RiskScore::from_counts(&SeverityCounts {
            critical,
            warning: 0,
            info: 0,
        });
        assert!(risk.score >= previous);
        previous = risk.score;
    }
    let huge = RiskScore::from_counts(&SeverityCounts {
        critical: usize::MAX,
        warning: usize::MAX,
        info: 0,
    });
    assert_eq!(huge.score, 100);
}

#[test]
fn risk_classes_follow_thresholds() {
    let classify = |critical, warning| {
        RiskScore::from_counts(&SeverityCounts {
            critical,
            warning,
            info: 0,
        })
        .class
    };
    assert_eq!(classify(0, 1), RiskClass::Low);
    assert_eq!(classify(0, 2), RiskClass::Medium);
    assert_eq!(classify(1, 1), RiskClass::Medium);
    assert_eq!(classify(0, 4), RiskClass::High);
    assert_eq!(classify(2, 0), RiskClass::High);
    assert_eq!(classify(0, 0), RiskClass::Low);
}

#[test]
fn root_children_sort_by_total_with_stable_ties() {
    let taxonomy = Taxonomy::builtin();
    let filter = all_on(&taxonomy);
    let rows = children(&mixed_tree(), &Scope::Root, &filter);
    let names = rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["internal", "cmd", "web"]);
    assert_eq!(rows[0].scope, Some(Scope::Folder("internal".to_string())));

    // recon focus hides the info finding: cmd and web tie at zero, tree order kept
    let recon = FilterState::defaults(&taxonomy);
    let rows = children(&mixed_tree(), &Scope::Root, &recon);
    let names = rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["internal", "cmd", "web"]);
    assert_eq!(rows[1].aggregate.total, 0);
}

#[test]
fn folder_children_are_files() {
    let taxonomy = Taxonomy::builtin();
    let filter = FilterState::defaults(&taxonomy);
    let rows = children(&mixed_tree(), &Scope::Folder("internal".to_string()), &filter);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "store.go");
    assert_eq!(rows[0].risk.score, 55);
    assert_eq!(rows[0].risk.class, RiskClass::High);
    assert_eq!(rows[1].scope, Some(Scope::file("internal", "cache.go")));
}

#[test]
fn file_children_group_by_symbol() {
    let taxonomy = Taxonomy::builtin();
    let filter = FilterState::defaults(&taxonomy);
    let rows = children(&mixed_tree(), &Scope::file("internal", "store.go"), &filter);
    let names = rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["close", "open", PACKAGE_LEVEL]);
    assert_eq!(rows[0].aggregate.total, 2);
    assert!(rows.iter().all(|row| row.scope.is_none()));
}

#[test]
fn unknown_scope_has_no_children() {
    let taxonomy = Taxonomy::builtin();
    let filter = FilterState::defaults(&taxonomy);
    assert!(children(&mixed_tree(), &Scope::Folder("gone".to_string()), &filter).is_empty());
    assert_eq!(
        aggregate(&mixed_tree(), &Scope::file("gone", "x.go"), &filter),
        Aggregate::default()
    );
}
