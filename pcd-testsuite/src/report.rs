use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    catalog::{list, plain, Catalog, TestConfiguration},
    error::ReportError,
};

pub const RESULTS_CSV: &str = "copc_test_results.csv";
pub const QUICK_REFERENCE: &str = "copc_test_quick_reference.txt";

pub const RESULT_COLUMNS: [&str; 16] = [
    "test_id",
    "test_name",
    "timestamp",
    "gpu",
    "ram_gb",
    "browser",
    "initial_load_time_ms",
    "average_fps",
    "min_fps",
    "max_fps",
    "memory_usage_mb",
    "visual_quality_score",
    "navigation_smoothness_score",
    "visible_point_count",
    "loaded_node_count",
    "notes",
];

// Checked in order, first match wins. "Recommended Balanced" lands in
// Balanced, not Recommended; reordering changes existing groupings.
pub const CATEGORY_KEYWORDS: [(&str, &str); 10] = [
    ("Mobile", "Mobile"),
    ("Desktop", "Desktop"),
    ("Balanced", "Balanced"),
    ("Progressive", "Progressive"),
    ("Decimation", "Decimation"),
    ("Altitude", "Altitude Filters"),
    ("Backscatter", "Backscatter Filters"),
    ("Recommended", "Recommended"),
    ("Detail", "Detail Levels"),
    ("Budget", "Point Budget"),
];

const WORKFLOW: &str = "\
1. Start with recommended tests (T049, T050)
2. If too slow, try lower depth/budget tests (T001-T003)
3. If too fast, try higher depth/budget tests (T004-T007)
4. Test specific features:
   - Altitude filters: T034-T037
   - Backscatter filters: T038-T039
   - Progressive loading: T018-T020
   - Mobile optimization: T027-T028
";

pub fn category(name: &str) -> &'static str {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or("Other")
}

pub fn categorize(catalog: &Catalog) -> BTreeMap<&'static str, Vec<&TestConfiguration>> {
    let mut categories: BTreeMap<&'static str, Vec<&TestConfiguration>> = BTreeMap::new();
    for test in &catalog.test_configurations {
        categories.entry(category(&test.name)).or_default().push(test);
    }
    categories
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FpsBracket {
    Sixty,
    FortyFiveToSixty,
    ThirtyToFortyFive,
    BelowThirty,
}

impl FpsBracket {
    pub const ALL: [FpsBracket; 4] = [
        FpsBracket::Sixty,
        FpsBracket::FortyFiveToSixty,
        FpsBracket::ThirtyToFortyFive,
        FpsBracket::BelowThirty,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FpsBracket::Sixty => "60 FPS",
            FpsBracket::FortyFiveToSixty => "45-60 FPS",
            FpsBracket::ThirtyToFortyFive => "30-45 FPS",
            FpsBracket::BelowThirty => "Below 30 FPS",
        }
    }
}

/// Classifies the free-form `expected_fps` text by substring.
pub fn fps_bracket(expected_fps: &str) -> FpsBracket {
    if expected_fps.contains("60") && !expected_fps.contains("45") {
        FpsBracket::Sixty
    } else if expected_fps.contains("45-60") {
        FpsBracket::FortyFiveToSixty
    } else if expected_fps.contains("30") {
        if expected_fps.contains("15") || expected_fps.contains('<') {
            FpsBracket::BelowThirty
        } else {
            FpsBracket::ThirtyToFortyFive
        }
    } else {
        FpsBracket::BelowThirty
    }
}

/// `1234567` -> `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn write_summary<W: Write>(catalog: &Catalog, w: &mut W) -> Result<(), ReportError> {
    let rule = "=".repeat(80);
    let filter = &catalog.metadata.spatial_filter;

    writeln!(w, "{rule}")?;
    writeln!(w, "COPC VISUALIZATION TEST SUITE")?;
    writeln!(w, "{rule}")?;
    writeln!(w, "\nTotal tests: {}", catalog.test_configurations.len())?;
    writeln!(w, "Target file: {}", catalog.metadata.target_file)?;
    writeln!(
        w,
        "Spatial filter: Lat {}, Lon {}",
        list(&filter.latitude_range),
        list(&filter.longitude_range)
    )?;

    writeln!(w, "\n{rule}")?;
    writeln!(w, "TEST CATEGORIES")?;
    writeln!(w, "{rule}")?;

    for (category, tests) in categorize(catalog) {
        writeln!(w, "\n{category}: {} tests", tests.len())?;
        for test in tests.iter().take(3) {
            writeln!(w, "  - {}: {}", test.test_id, test.name)?;
        }
        if tests.len() > 3 {
            writeln!(w, "  ... and {} more", tests.len() - 3)?;
        }
    }
    Ok(())
}

pub fn write_test_details<W: Write>(
    catalog: &Catalog,
    test_id: &str,
    w: &mut W,
) -> Result<(), ReportError> {
    let test = catalog.find(test_id)?;
    let rule = "=".repeat(80);

    writeln!(w, "\n{rule}")?;
    writeln!(w, "TEST {}: {}", test.test_id, test.name)?;
    writeln!(w, "{rule}")?;
    writeln!(w, "\nUse Case: {}", test.use_case)?;
    writeln!(w, "Expected FPS: {}", test.expected_fps)?;
    writeln!(w, "\nConfiguration:")?;
    writeln!(w, "  Max Depth: {}", test.max_depth)?;
    writeln!(w, "  Point Budget: {}", thousands(test.point_budget))?;
    writeln!(w, "  LOD Strategy: {}", test.lod_strategy)?;
    writeln!(w, "  LOD Threshold: {}", plain(&test.lod_threshold))?;
    writeln!(w, "  Decimation: {}", plain(&test.decimation))?;

    for (key, group) in test.setting_groups() {
        writeln!(w, "\n{}:", title_case(key))?;
        match group.as_object() {
            Some(entries) => {
                for (k, v) in entries {
                    writeln!(w, "  {k}: {}", plain(v))?;
                }
            }
            None => writeln!(w, "  {}", plain(group))?,
        }
    }
    Ok(())
}

/// `altitude_filter` -> `Altitude Filter`
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// CSV template with one row per test; only id and name are filled in.
pub fn write_results_csv<W: Write>(catalog: &Catalog, w: W) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(RESULT_COLUMNS)?;
    for test in &catalog.test_configurations {
        let mut row = vec![test.test_id.as_str(), test.name.as_str()];
        row.resize(RESULT_COLUMNS.len(), "");
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_quick_reference<W: Write>(catalog: &Catalog, w: &mut W) -> Result<(), ReportError> {
    let rule = "=".repeat(80);
    let thin = "-".repeat(80);
    let filter = &catalog.metadata.spatial_filter;

    writeln!(w, "COPC VISUALIZATION TEST SUITE - QUICK REFERENCE")?;
    writeln!(w, "{rule}\n")?;

    writeln!(w, "PRESET CONFIGURATION:")?;
    writeln!(w, "{thin}")?;
    writeln!(w, "File: {}", catalog.metadata.target_file)?;
    writeln!(w, "Latitude Range: {} degrees", range_text(&filter.latitude_range))?;
    writeln!(w, "Longitude Range: {} degrees", range_text(&filter.longitude_range))?;
    if let Some(region) = &catalog.metadata.region {
        writeln!(w, "Region: {region}")?;
    }
    writeln!(w)?;

    writeln!(w, "RECOMMENDED STARTING TESTS:")?;
    writeln!(w, "{thin}")?;
    for test in catalog.recommended() {
        writeln!(w, "{}: {}", test.test_id, test.name)?;
        writeln!(w, "  - {}", test.use_case)?;
        writeln!(
            w,
            "  - Depth: {}, Budget: {}, Expected FPS: {}\n",
            test.max_depth,
            thousands(test.point_budget),
            test.expected_fps
        )?;
    }

    writeln!(w, "\nALL TESTS BY CATEGORY:")?;
    writeln!(w, "{rule}\n")?;

    let mut brackets: BTreeMap<FpsBracket, Vec<&TestConfiguration>> = BTreeMap::new();
    for test in &catalog.test_configurations {
        brackets
            .entry(fps_bracket(&test.expected_fps))
            .or_default()
            .push(test);
    }
    for bracket in FpsBracket::ALL {
        let Some(tests) = brackets.get(&bracket) else {
            continue;
        };
        writeln!(w, "{} ({} tests):", bracket.label(), tests.len())?;
        writeln!(w, "{thin}")?;
        for test in tests {
            writeln!(
                w,
                "{}: {:<45} (Depth: {}, Budget: {:>9})",
                test.test_id,
                test.name,
                test.max_depth,
                thousands(test.point_budget)
            )?;
        }
        writeln!(w)?;
    }

    writeln!(w, "\nTESTING WORKFLOW:")?;
    writeln!(w, "{rule}")?;
    write!(w, "{WORKFLOW}")?;
    writeln!(w, "5. Record results in {RESULTS_CSV}")?;
    Ok(())
}

fn range_text(range: &[serde_json::Value]) -> String {
    match range {
        [lo, hi] => format!("{} to {}", plain(lo), plain(hi)),
        other => list(other),
    }
}

/// JavaScript snippet in the viewer's configuration shape.
pub fn export_viewer_config<W: Write>(
    catalog: &Catalog,
    test_id: &str,
    w: &mut W,
) -> Result<(), ReportError> {
    let test = catalog.find(test_id)?;
    let filter = &catalog.metadata.spatial_filter;
    let quote = |s: &str| serde_json::to_string(s);

    writeln!(w, "// Test Configuration: {} - {}", test.test_id, test.name)?;
    writeln!(w, "const testConfig = {{")?;
    writeln!(w, "  // Spatial Filter")?;
    writeln!(w, "  spatialFilter: {{")?;
    writeln!(w, "    latitudeRange: {},", list(&filter.latitude_range))?;
    writeln!(w, "    longitudeRange: {}", list(&filter.longitude_range))?;
    writeln!(w, "  }},\n")?;
    writeln!(w, "  // COPC File")?;
    writeln!(w, "  copcFile: {},\n", quote(&catalog.metadata.target_file)?)?;
    writeln!(w, "  // Loading Parameters")?;
    writeln!(w, "  maxDepth: {},", test.max_depth)?;
    writeln!(w, "  pointBudget: {},", test.point_budget)?;
    writeln!(w, "  lodStrategy: {},", quote(&test.lod_strategy)?)?;
    writeln!(w, "  lodThreshold: {},", test.lod_threshold)?;
    writeln!(w, "  decimation: {},\n", quote(&plain(&test.decimation))?)?;
    writeln!(w, "  // Expected Performance")?;
    writeln!(w, "  expectedFps: {},", quote(&test.expected_fps)?)?;
    writeln!(w, "  useCase: {}", quote(&test.use_case)?)?;
    writeln!(w, "}};\n")?;
    writeln!(w, "// Usage with deck.gl:")?;
    writeln!(w, "/*")?;
    writeln!(w, "const layer = new PointCloudLayer({{")?;
    writeln!(w, "  id: 'calipso-copc',")?;
    writeln!(w, "  data: loadCOPCWithConfig(testConfig),")?;
    writeln!(w, "  // ... other layer properties")?;
    writeln!(w, "}});")?;
    writeln!(w, "*/")?;
    Ok(())
}

pub fn export_file_name(test_id: &str) -> String {
    format!("test_{test_id}_config.js")
}

fn create(path: &Path) -> Result<BufWriter<File>, ReportError> {
    Ok(BufWriter::new(File::create(path)?))
}

pub fn write_results_csv_file(catalog: &Catalog, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(RESULTS_CSV);
    write_results_csv(catalog, create(&path)?)?;
    log::info!("created results CSV template: {:?}", path);
    Ok(path)
}

pub fn write_quick_reference_file(catalog: &Catalog, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(QUICK_REFERENCE);
    let mut w = create(&path)?;
    write_quick_reference(catalog, &mut w)?;
    w.flush()?;
    log::info!("created quick reference: {:?}", path);
    Ok(path)
}

pub fn export_viewer_config_file(
    catalog: &Catalog,
    test_id: &str,
    dir: &Path,
) -> Result<PathBuf, ReportError> {
    // resolve the id first so an unknown test leaves no empty file behind
    catalog.find(test_id)?;
    let path = dir.join(export_file_name(test_id));
    let mut w = create(&path)?;
    export_viewer_config(catalog, test_id, &mut w)?;
    w.flush()?;
    log::info!("exported viewer config: {:?}", path);
    Ok(path)
}
