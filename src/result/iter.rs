//! Streaming row iterator over one response body.

use std::fmt;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use crate::client::{ClientError, ClientResult};
use crate::logging::Logger;
use crate::throttle::ThrottlePermit;
use crate::transport::ResponseBody;

use super::columns::ColumnIndex;
use super::row::Row;

/// Lazily decodes rows from a tab-separated response with a header line.
///
/// The iterator owns the response stream and closes it exactly once: on
/// exhaustion, on the first read or decoding error, on [`RowIter::close`],
/// or on drop, whichever comes first. A throttled fetch also parks its
/// throttle permit here, so the slot is held until the stream is closed.
///
/// Two ways to drive it:
/// - [`RowIter::advance`] + [`RowIter::row`] + [`RowIter::err`];
/// - the `Iterator` impl, which yields a recorded error once, then ends.
pub struct RowIter {
    reader: Option<BufReader<ResponseBody>>,
    columns: Arc<ColumnIndex>,
    current: Option<Row>,
    err: Option<ClientError>,
    err_yielded: bool,
    permit: Option<ThrottlePermit>,
    logger: Logger,
    line: Vec<u8>,
}

impl RowIter {
    /// Wrap a response body and read its header line.
    ///
    /// Fails with [`ClientError::NoColumns`] if the body ends or errors
    /// before a header is read. The body is closed in that case.
    pub(crate) fn open(
        body: ResponseBody,
        logger: Logger,
        permit: Option<ThrottlePermit>,
    ) -> ClientResult<Self> {
        logger.debug("Open stream to fetch");

        let mut iter = Self {
            reader: Some(BufReader::new(body)),
            columns: Arc::new(ColumnIndex::parse("")),
            current: None,
            err: None,
            err_yielded: false,
            permit,
            logger,
            line: Vec::with_capacity(256),
        };

        let header = match iter.read_line() {
            Ok(Some(header)) => header,
            Ok(None) => {
                iter.logger.fatal("Catch error can't get columns names");
                iter.close();
                return Err(ClientError::NoColumns);
            }
            Err(e) => {
                iter.logger
                    .fatal(&format!("Catch error can't get columns names: {}", e));
                iter.close();
                return Err(ClientError::NoColumns);
            }
        };

        iter.columns = Arc::new(ColumnIndex::parse(&header));
        iter.logger.debug("Load fields names");

        Ok(iter)
    }

    /// Column names from the header line.
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    /// Move to the next row.
    ///
    /// Returns false once the stream is exhausted or has failed; check
    /// [`RowIter::err`] to tell the two apart.
    pub fn advance(&mut self) -> bool {
        self.current = None;

        match self.read_line() {
            Ok(Some(line)) => match self.columns.decode(&line) {
                Ok(row) => {
                    self.current = Some(row);
                    true
                }
                Err(e) => {
                    self.fail(e);
                    false
                }
            },
            Ok(None) => {
                self.close();
                false
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Row produced by the last successful [`RowIter::advance`].
    pub fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// Take ownership of the current row.
    pub fn take_row(&mut self) -> Option<Row> {
        self.current.take()
    }

    /// Error that stopped the iteration, if any.
    pub fn err(&self) -> Option<&ClientError> {
        self.err.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Close the stream and release the throttle slot. Idempotent.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            drop(reader);
            self.permit = None;
            self.logger.debug("The query is fetched");
        }
    }

    fn fail(&mut self, err: ClientError) {
        self.logger.fatal(&format!("Catch error {}", err));
        self.err = Some(err);
        self.close();
    }

    /// Next line without its terminator; `None` at end of stream.
    fn read_line(&mut self) -> ClientResult<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        self.line.clear();
        let read = reader.read_until(b'\n', &mut self.line)?;
        if read == 0 {
            return Ok(None);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
        }

        Ok(Some(String::from_utf8_lossy(&self.line).into_owned()))
    }
}

impl Iterator for RowIter {
    type Item = ClientResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.current.take().map(Ok);
        }

        match &self.err {
            Some(err) if !self.err_yielded => {
                self.err_yielded = true;
                Some(Err(err.clone()))
            }
            _ => None,
        }
    }
}

impl Drop for RowIter {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for RowIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIter")
            .field("columns", &self.columns.names())
            .field("closed", &self.is_closed())
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::Throttle;
    use std::io::{self, Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Body that counts how many times it is dropped.
    struct CountingBody {
        inner: Cursor<Vec<u8>>,
        drops: Arc<AtomicUsize>,
    }

    impl Read for CountingBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for CountingBody {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Body that yields some bytes and then fails.
    struct FailingBody {
        inner: Cursor<Vec<u8>>,
    }

    impl Read for FailingBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            Ok(n)
        }
    }

    fn counting(data: &str) -> (ResponseBody, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let body = CountingBody {
            inner: Cursor::new(data.as_bytes().to_vec()),
            drops: Arc::clone(&drops),
        };
        (Box::new(body), drops)
    }

    fn open(data: &str) -> ClientResult<RowIter> {
        RowIter::open(
            Box::new(Cursor::new(data.as_bytes().to_vec())),
            Logger::silent(),
            None,
        )
    }

    #[test]
    fn test_rows_match_header() {
        let mut iter = open("id\tname\tengine\n1\tsystem\tMemory\n2\tdefault\tAtomic\n").unwrap();
        assert_eq!(iter.columns(), ["id", "name", "engine"]);

        assert!(iter.advance());
        let row = iter.row().unwrap();
        assert_eq!(row.string("name").unwrap(), "system");
        assert_eq!(row.u8("id").unwrap(), 1);

        assert!(iter.advance());
        assert_eq!(iter.row().unwrap().string("engine").unwrap(), "Atomic");

        assert!(!iter.advance());
        assert!(iter.err().is_none());
        assert!(iter.is_closed());
        assert!(iter.row().is_none());
    }

    #[test]
    fn test_every_cell_reachable() {
        let header = ["a", "b", "c", "d"];
        let lines = [["1", "2", "3", "4"], ["", "x", "", "y"], ["p", "q", "r", "s"]];
        let mut body = header.join("\t");
        body.push('\n');
        for line in &lines {
            body.push_str(&line.join("\t"));
            body.push('\n');
        }

        let rows: Vec<Row> = open(&body).unwrap().collect::<ClientResult<_>>().unwrap();
        assert_eq!(rows.len(), lines.len());
        for (row, line) in rows.iter().zip(lines.iter()) {
            assert_eq!(row.columns(), header);
            for (column, cell) in header.iter().zip(line.iter()) {
                assert_eq!(row.string(column).unwrap(), *cell);
            }
        }
    }

    #[test]
    fn test_unterminated_last_line() {
        let rows: Vec<Row> = open("n\n1\n2").unwrap().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].u8("n").unwrap(), 2);
    }

    #[test]
    fn test_empty_body_has_no_columns() {
        let (body, drops) = counting("");
        let err = RowIter::open(body, Logger::silent(), None).unwrap_err();
        assert_eq!(err, ClientError::NoColumns);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_header_read_error_has_no_columns() {
        let body = FailingBody {
            inner: Cursor::new(Vec::new()),
        };
        let err = RowIter::open(Box::new(body), Logger::silent(), None).unwrap_err();
        assert_eq!(err, ClientError::NoColumns);
    }

    #[test]
    fn test_header_only() {
        let mut iter = open("a\tb\n").unwrap();
        assert_eq!(iter.columns(), ["a", "b"]);
        assert!(!iter.advance());
        assert!(iter.err().is_none());
    }

    #[test]
    fn test_malformed_row_stops_iteration() {
        let (body, drops) = counting("a\tb\tc\n1\t2\t3\n1\t2\n4\t5\t6\n");
        let mut iter = RowIter::open(body, Logger::silent(), None).unwrap();

        assert!(iter.advance());
        assert!(!iter.advance());
        assert_eq!(
            iter.err(),
            Some(&ClientError::MalformedRow { expected: 3, found: 2 })
        );
        assert!(iter.is_closed());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!iter.advance());
    }

    #[test]
    fn test_iterator_yields_error_once() {
        let mut iter = open("a\tb\n1\n").unwrap();
        assert!(matches!(iter.next(), Some(Err(ClientError::MalformedRow { .. }))));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_read_error_recorded() {
        let body = FailingBody {
            inner: Cursor::new(b"a\n1\n".to_vec()),
        };
        let mut iter = RowIter::open(Box::new(body), Logger::silent(), None).unwrap();
        assert!(iter.advance());
        assert!(!iter.advance());
        assert!(matches!(iter.err(), Some(ClientError::Read(message)) if message.contains("reset")));
        assert!(iter.is_closed());
    }

    #[test]
    fn test_close_twice_closes_once() {
        let (body, drops) = counting("a\n1\n");
        let mut iter = RowIter::open(body, Logger::silent(), None).unwrap();

        iter.close();
        iter.close();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!iter.advance());

        drop(iter);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_auto_close_then_close() {
        let (body, drops) = counting("a\n1\n");
        let mut iter = RowIter::open(body, Logger::silent(), None).unwrap();
        while iter.advance() {}
        iter.close();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_permit_released_on_close() {
        let throttle = Arc::new(Throttle::new(1));
        let permit = throttle.acquire();
        let mut iter = RowIter::open(
            Box::new(Cursor::new(b"a\n1\n".to_vec())),
            Logger::silent(),
            Some(permit),
        )
        .unwrap();

        assert_eq!(throttle.in_flight(), 1);
        assert!(iter.advance());
        assert_eq!(throttle.in_flight(), 1);
        assert!(!iter.advance());
        assert_eq!(throttle.in_flight(), 0);
    }

    #[test]
    fn test_permit_released_on_no_columns() {
        let throttle = Arc::new(Throttle::new(1));
        let permit = throttle.acquire();
        let result = RowIter::open(Box::new(Cursor::new(Vec::new())), Logger::silent(), Some(permit));
        assert!(result.is_err());
        assert_eq!(throttle.in_flight(), 0);
    }
}
