//! HTML rendering of the search page.

use serde::Serialize;

use crate::analysis::Analysis;
use crate::models::{Rating, RatingResult, SkippedVenue};
use crate::sentiment::MAX_LABEL;

const MAX_HIGHLIGHTS: usize = 3;
const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

/// What goes in the output area under the form.
pub enum PageBody<'a> {
    Empty,
    Message { title: &'a str, detail: &'a str },
    Results {
        results: &'a [RatingResult],
        skipped: &'a [SkippedVenue],
        analysis: &'a Analysis,
    },
}

/// `★` per whole star, `½` for a half, `☆` for the rest of five.
pub fn star_glyphs(stars: f64) -> String {
    let slots = usize::from(MAX_LABEL);
    let halves = (stars.clamp(0.0, f64::from(MAX_LABEL)) * 2.0).round() as usize;
    let full = halves / 2;
    let half = halves % 2;

    let mut glyphs = "★".repeat(full);
    if half == 1 {
        glyphs.push('½');
    }
    glyphs.push_str(&"☆".repeat(slots - full - half));
    glyphs
}

pub fn rating_label(rating: &Rating) -> String {
    match rating {
        Rating::Unrated => "Not yet rated".to_string(),
        Rating::Rated { stars, .. } => format!("{} {:.1}", star_glyphs(*stars), stars),
    }
}

pub fn render_page(cuisine: &str, location: &str, body: PageBody<'_>) -> String {
    let mut buf = String::new();

    buf.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    buf.push_str("<meta charset=\"utf-8\">\n");
    buf.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    buf.push_str("<title>Palate - restaurant ratings from reviews</title>\n");
    buf.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">\n", LEAFLET_CSS));
    buf.push_str(STYLE);
    buf.push_str("</head>\n<body>\n<main>\n");
    buf.push_str("<h1>🍽️ Palate</h1>\n");
    buf.push_str("<p class=\"lead\">Find restaurants and see how their reviews really feel.</p>\n");

    buf.push_str(&render_form(cuisine, location));

    match body {
        PageBody::Empty => {}
        PageBody::Message { title, detail } => {
            buf.push_str(&format!(
                "<section class=\"notice\"><h2>{}</h2><p>{}</p></section>\n",
                escape(title),
                escape(detail)
            ));
        }
        PageBody::Results {
            results,
            skipped,
            analysis,
        } => {
            buf.push_str(&render_results(results, skipped));
            if !results.is_empty() {
                buf.push_str(&render_map(results));
                buf.push_str(&render_analysis(analysis));
            }
        }
    }

    buf.push_str("</main>\n</body>\n</html>\n");
    buf
}

fn render_form(cuisine: &str, location: &str) -> String {
    format!(
        "<form action=\"/search\" method=\"get\" class=\"search\">\n\
         <label>Cuisine <input name=\"cuisine\" required maxlength=\"100\" placeholder=\"sushi\" value=\"{}\"></label>\n\
         <label>Location <input name=\"location\" required maxlength=\"100\" placeholder=\"Boston\" value=\"{}\"></label>\n\
         <button type=\"submit\">Search</button>\n\
         </form>\n",
        escape(cuisine),
        escape(location)
    )
}

fn render_results(results: &[RatingResult], skipped: &[SkippedVenue]) -> String {
    let mut buf = String::new();
    buf.push_str("<section class=\"results\">\n<h2>Top restaurants</h2>\n");

    if results.is_empty() {
        buf.push_str(&format!(
            "<p class=\"notice\">Found {} restaurants but none could be rated right now.</p>\n",
            skipped.len()
        ));
    } else {
        buf.push_str("<ol>\n");
        for result in results {
            buf.push_str(&render_result(result));
        }
        buf.push_str("</ol>\n");
    }

    if !skipped.is_empty() {
        buf.push_str(&format!(
            "<p class=\"skipped\">{} restaurant(s) left out: {}</p>\n",
            skipped.len(),
            skipped
                .iter()
                .map(|s| escape(&s.name))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    buf.push_str("</section>\n");
    buf
}

fn render_result(result: &RatingResult) -> String {
    let venue = &result.venue;
    let mut buf = String::new();

    buf.push_str("<li class=\"venue\">\n");
    buf.push_str(&format!("<h3>{}</h3>\n", escape(&venue.name)));
    if !venue.category.is_empty() {
        buf.push_str(&format!("<p class=\"category\">{}</p>\n", escape(&venue.category)));
    }
    buf.push_str(&format!("<p class=\"address\">{}</p>\n", escape(&venue.address)));
    buf.push_str(&format!(
        "<p class=\"rating\">{} <span class=\"count\">({} reviews)</span></p>\n",
        escape(&rating_label(&result.rating)),
        result.review_count
    ));

    if !result.reviews.is_empty() {
        buf.push_str("<ul class=\"highlights\">\n");
        for review in result.reviews.iter().take(MAX_HIGHLIGHTS) {
            buf.push_str(&format!(
                "<li><span class=\"stars\">{}</span> {}</li>\n",
                star_glyphs(f64::from(review.score.label)),
                escape(&review.text)
            ));
        }
        buf.push_str("</ul>\n");
    }

    buf.push_str("</li>\n");
    buf
}

#[derive(Serialize)]
struct Marker<'a> {
    name: &'a str,
    lat: f64,
    lng: f64,
    rating: String,
}

fn render_map(results: &[RatingResult]) -> String {
    let markers: Vec<Marker<'_>> = results
        .iter()
        .map(|r| Marker {
            name: &r.venue.name,
            lat: r.venue.coordinates.latitude,
            lng: r.venue.coordinates.longitude,
            rating: rating_label(&r.rating),
        })
        .collect();
    let markers_json = serde_json::to_string(&markers)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    format!(
        "<section class=\"map\">\n<h2>🗺️ Map</h2>\n<div id=\"map\"></div>\n\
         <script src=\"{}\"></script>\n\
         <script>\n\
         const markers = {};\n\
         const map = L.map('map');\n\
         L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{\n\
           attribution: '&copy; OpenStreetMap contributors'\n\
         }}).addTo(map);\n\
         const bounds = [];\n\
         for (const m of markers) {{\n\
           const marker = L.marker([m.lat, m.lng]).addTo(map);\n\
           const popup = document.createElement('div');\n\
           popup.innerText = m.name + '\\n' + m.rating;\n\
           marker.bindPopup(popup);\n\
           bounds.push([m.lat, m.lng]);\n\
         }}\n\
         map.fitBounds(bounds, {{ padding: [30, 30], maxZoom: 15 }});\n\
         </script>\n</section>\n",
        LEAFLET_JS, markers_json
    )
}

fn render_analysis(analysis: &Analysis) -> String {
    let mut buf = String::new();
    buf.push_str("<section class=\"analysis\">\n<h2>📈 Recommendation analysis</h2>\n");

    buf.push_str("<h3>Cuisine popularity</h3>\n");
    if analysis.cuisines.is_empty() {
        buf.push_str("<p class=\"notice\">No cuisine data available.</p>\n");
    } else {
        let rows: Vec<(String, usize)> = analysis
            .cuisines
            .iter()
            .map(|c| (c.cuisine.clone(), c.count))
            .collect();
        buf.push_str(&render_bars(&rows));
    }

    buf.push_str("<h3>Price vs rating</h3>\n");
    if analysis.price_vs_rating.is_empty() {
        buf.push_str("<p class=\"notice\">No rated restaurants with price information.</p>\n");
    } else {
        buf.push_str("<table>\n<tr><th>Price</th><th>Restaurants</th><th>Min</th><th>Median</th><th>Max</th></tr>\n");
        for band in &analysis.price_vs_rating {
            buf.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{:.1}</td><td>{:.1}</td></tr>\n",
                "$".repeat(usize::from(band.price)),
                band.count,
                band.min,
                band.median,
                band.max
            ));
        }
        buf.push_str("</table>\n");
    }

    buf.push_str("<h3>💬 Review insights</h3>\n");
    if analysis.top_terms.is_empty() {
        buf.push_str("<p class=\"notice\">No reviews available for analysis.</p>\n");
    } else {
        buf.push_str("<h4>Most mentioned</h4>\n");
        let rows: Vec<(String, usize)> = analysis
            .top_terms
            .iter()
            .map(|t| (t.term.clone(), t.count))
            .collect();
        buf.push_str(&render_bars(&rows));
    }
    if !analysis.review_lengths.is_empty() {
        buf.push_str("<h4>Review length (characters)</h4>\n");
        let rows: Vec<(String, usize)> = analysis
            .review_lengths
            .iter()
            .map(|b| match b.to {
                Some(to) => (format!("{}-{}", b.from, to), b.count),
                None => (format!("{}+", b.from), b.count),
            })
            .collect();
        buf.push_str(&render_bars(&rows));
    }

    buf.push_str("</section>\n");
    buf
}

fn render_bars(rows: &[(String, usize)]) -> String {
    let max = rows.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    let mut buf = String::from("<div class=\"bars\">\n");
    for (label, count) in rows {
        buf.push_str(&format!(
            "<div class=\"bar\"><span class=\"label\">{}</span><span class=\"fill\" style=\"width: {}%\"></span><span class=\"value\">{}</span></div>\n",
            escape(label),
            count * 100 / max,
            count
        ));
    }
    buf.push_str("</div>\n");
    buf
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "<style>\n\
body { font-family: system-ui, sans-serif; margin: 0; background: #111; color: #eee; }\n\
main { max-width: 960px; margin: 0 auto; padding: 1.5rem; }\n\
.lead { color: #aaa; }\n\
form.search { display: flex; gap: 1rem; flex-wrap: wrap; align-items: end; margin-bottom: 1.5rem; }\n\
form.search input { display: block; padding: .4rem; }\n\
.venue { margin-bottom: 1rem; }\n\
.rating { color: #ffb400; font-size: 1.2rem; }\n\
.count, .category, .address, .skipped { color: #aaa; }\n\
.highlights { color: #ccc; font-size: .9rem; }\n\
#map { height: 420px; border-radius: 8px; }\n\
table { border-collapse: collapse; }\n\
td, th { padding: .3rem .8rem; border-bottom: 1px solid #333; text-align: left; }\n\
.bar { display: flex; align-items: center; gap: .5rem; margin: .2rem 0; }\n\
.bar .label { width: 12rem; }\n\
.bar .fill { background: teal; height: .9rem; display: inline-block; }\n\
.notice { color: #ffa500; }\n\
</style>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::test_utils::{rated_result, unrated_result, with_reviews};

    #[test]
    fn star_glyphs_use_half_star_for_fractions() {
        assert_eq!(star_glyphs(5.0), "★★★★★");
        assert_eq!(star_glyphs(4.5), "★★★★½");
        assert_eq!(star_glyphs(3.0), "★★★☆☆");
        assert_eq!(star_glyphs(1.5), "★½☆☆☆");
        assert_eq!(star_glyphs(1.0), "★☆☆☆☆");
    }

    #[test]
    fn unrated_venues_show_no_number() {
        assert_eq!(rating_label(&Rating::Unrated), "Not yet rated");
        assert_eq!(
            rating_label(&Rating::Rated { mean: 4.4, stars: 4.5 }),
            "★★★★½ 4.5"
        );
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"Tom's\" & Co</b>"), "&lt;b&gt;&quot;Tom&#39;s&quot; &amp; Co&lt;/b&gt;");
    }

    #[test]
    fn results_page_lists_venues_in_order_with_map() {
        let mut first = with_reviews(rated_result("a", 4.5, 2), &["<script>alert(1)</script>"], 5);
        first.venue.name = "Oishii".to_string();
        let mut second = unrated_result("b");
        second.venue.name = "Quiet Corner".to_string();
        let results = vec![first, second];
        let analysis = analyze(&results);

        let html = render_page(
            "sushi",
            "Boston",
            PageBody::Results {
                results: &results,
                skipped: &[],
                analysis: &analysis,
            },
        );

        let oishii = html.find("Oishii").unwrap();
        let quiet = html.find("Quiet Corner").unwrap();
        assert!(oishii < quiet);
        assert!(html.contains("★★★★½ 4.5"));
        assert!(html.contains("Not yet rated"));
        assert!(html.contains("id=\"map\""));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("value=\"sushi\""));
    }

    #[test]
    fn long_reviews_are_labelled_as_open_ended() {
        let long = "w".repeat(4000);
        let results = vec![with_reviews(rated_result("a", 4.0, 2), &["short", long.as_str()], 4)];
        let html = render_analysis(&analyze(&results));

        assert!(html.contains("<span class=\"label\">0-99</span>"));
        assert!(html.contains("<span class=\"label\">900-999</span>"));
        assert!(html.contains("<span class=\"label\">1000+</span>"));
        assert!(!html.contains("3900"));
    }

    #[test]
    fn message_page_has_form_and_no_map() {
        let html = render_page(
            "tapas",
            "Nowhere",
            PageBody::Message {
                title: "No restaurants found",
                detail: "Try another cuisine or location.",
            },
        );
        assert!(html.contains("No restaurants found"));
        assert!(html.contains("<form action=\"/search\""));
        assert!(!html.contains("id=\"map\""));
    }
}
