//! Progress reporting for multi-page operations

/// Progress callbacks for page loops
pub trait PageProgress {
    /// Called once before the first page with the number of pages to process
    fn begin(&mut self, total_pages: u32);

    /// Called after each page with the number of pages done so far
    fn page_done(&mut self, pages_done: u32);

    /// Called after the last page
    fn finish(&mut self) {}
}

/// A no-op progress reporter
pub struct NoProgress;

impl PageProgress for NoProgress {
    fn begin(&mut self, _total_pages: u32) {}
    fn page_done(&mut self, _pages_done: u32) {}
}

impl<P: PageProgress + ?Sized> PageProgress for &mut P {
    fn begin(&mut self, total_pages: u32) {
        (**self).begin(total_pages)
    }

    fn page_done(&mut self, pages_done: u32) {
        (**self).page_done(pages_done)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}
