// src/download/filename.rs
// =============================================================================
// Local filenames for downloaded images.
//
// Rules:
// - take the last segment of the URL path ("cat.png" in ".../img/cat.png")
// - no segment, or a segment without a dot -> page{N}_image_{seq}.jpg
// - otherwise -> page{N}_{segment}
//
// The page prefix keeps "1.jpg" from page 1 and "1.jpg" from page 2 apart.
// Query strings and fragments never end up in the name.
// =============================================================================

use url::Url;

// Derives the local filename for one image
//
// Parameters:
//   image_url: absolute image URL
//   page_index: 1-based index of the page the image was found on
//   seq_index: 1-based position of the image within that page
//
// Examples:
//   (".../img/cat.png", 1, 1) -> "page1_cat.png"
//   (".../cover", 3, 2)       -> "page3_image_2.jpg"
pub fn derive_filename(image_url: &str, page_index: usize, seq_index: usize) -> String {
    let basename = url_basename(image_url);

    if basename.is_empty() || !basename.contains('.') {
        format!("page{}_image_{}.jpg", page_index, seq_index)
    } else {
        format!("page{}_{}", page_index, basename)
    }
}

// Last path segment of a URL, as it appears in the URL (still percent-encoded)
fn url_basename(image_url: &str) -> String {
    let path = match Url::parse(image_url) {
        Ok(url) => url.path().to_string(),
        // Not parseable: strip query/fragment by hand and use what is left
        Err(_) => image_url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or("")
            .to_string(),
    };

    path.rsplit('/').next().unwrap_or("").to_string()
}
